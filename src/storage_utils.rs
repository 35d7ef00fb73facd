use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::chart::AxisMargin;
use crate::error::Result;
use crate::top_k::TieBreak;

// CONFIGURATION STRUCTS
// Every section falls back to its defaults, so a partial config.json is enough.

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ListingConfig {
    pub url: String,         // e.g., a day-gainers screener page
    pub pages: u32,          // e.g., 9 pages ...
    pub page_size: u32,      // ... of 100 rows
    pub change_label: String, // aria-label of the change cell
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url: "https://finance.yahoo.com/screener/predefined/day_gainers".to_string(),
            pages: 9,
            page_size: 100,
            change_label: "% Change".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub interval: String,    // e.g., "1min", "5min"
    pub output_size: String, // "full" or "compact"
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.alphavantage.co/query".to_string(),
            interval: "1min".to_string(),
            output_size: "full".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SelectionConfig {
    pub count: usize,
    pub tie_break: TieBreak,
    pub require_full_selection: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            count: 5,
            tie_break: TieBreak::default(),
            require_full_selection: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub max_points: usize,     // most recent bars kept per chart
    pub tick_divisions: usize, // x tick spacing is len / tick_divisions
    pub margin: AxisMargin,
    pub canvas_units: u32,
    pub pixels_per_unit: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            max_points: 1000,
            tick_divisions: 5,
            margin: AxisMargin::default(),
            canvas_units: 16,
            pixels_per_unit: 100,
        }
    }
}

impl ChartConfig {
    pub fn canvas_px(&self) -> u32 {
        self.canvas_units * self.pixels_per_unit
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub concurrency: usize,
    pub skip_failed_symbols: bool,
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            skip_failed_symbols: true,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub charts_dir: String, // relative to the storage directory
    pub summary_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            charts_dir: "charts".to_string(),
            summary_name: "summary".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    // Nested structs organize the config logically
    pub listing: ListingConfig,
    pub market_data: MarketDataConfig,
    pub selection: SelectionConfig,
    pub chart: ChartConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path to the storage directory (e.g., ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Creates a manager rooted at `base_dir`, creating the directory if needed.
    pub async fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }

    /// Creates a manager whose directory sits next to the running executable.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| std::io::Error::other("could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    /// Resolves (and creates) a subdirectory of the storage directory.
    pub async fn subdir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.base_dir.join(name);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", filename))
    }

    /// Serializes `data` to `<filename>.json`.
    ///
    /// Writes to a `.tmp` sibling first and renames it over the target, so a
    /// crash mid-write leaves the previous file intact.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        let final_path = self.path_of(filename);
        let tmp_path = self.base_dir.join(format!("{}.json.tmp", filename));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        // serde_json scans the bytes anyway, no need for a UTF-8 pass first.
        let content = fs::read(self.path_of(filename)).await?;
        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    /// Loads `<filename>.json`, writing `T::default()` there first if it is missing.
    pub async fn load_or_init<T>(&self, filename: &str) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        if fs::try_exists(self.path_of(filename)).await? {
            return self.load(filename).await;
        }
        let data = T::default();
        self.save(filename, &data).await?;
        info!(path = %self.path_of(filename).display(), "wrote default {}", filename);
        Ok(data)
    }
}
