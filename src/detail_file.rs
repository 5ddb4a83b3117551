//! PNN-SGT heart-rate log conventions
//!
//! Each log is a text file with one `<epoch-ms>;;Heart rate;<bpm>` line per reading.
//! The companion app identifies logs by file name:
//!
//! `#date=<start-ms>#time=<elapsed-ms>#calories=<kcal>#type=HeartRate#spmax=0#version=4.txt`

/// Metric label of heart-rate lines
pub const HEART_RATE_KIND: &str = "Heart rate";

/// Value of the `type` name segment for heart-rate logs
const TYPE_HEART_RATE: &str = "HeartRate";

const EXTENSION: &str = ".txt";

/// Parsed form of a detail log file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailFileName {
    /// Start of the log (epoch milliseconds)
    pub start_ms: i64,
    /// Time from first to last reading (milliseconds)
    pub elapsed_ms: i64,
    /// Calorie estimate
    pub calories: Option<u32>,
}

impl DetailFileName {
    /// Parse the base name of `path`. Returns `None` if it does not follow the
    /// heart-rate log convention.
    pub fn parse(path: &str) -> Option<Self> {
        let name = base_name(path);
        let stem = name.strip_prefix('#')?.strip_suffix(EXTENSION)?;

        let mut start_ms = None;
        let mut elapsed_ms = None;
        let mut calories = None;
        let mut is_heart_rate = false;

        for segment in stem.split('#') {
            let (key, value) = segment.split_once('=')?;
            match key {
                "date" => start_ms = Some(value.parse().ok()?),
                "time" => elapsed_ms = Some(value.parse().ok()?),
                "calories" => calories = Some(value.parse().ok()?),
                "type" => is_heart_rate = value == TYPE_HEART_RATE,
                _ => {}
            }
        }

        if !is_heart_rate {
            return None;
        }

        Some(Self {
            start_ms: start_ms?,
            elapsed_ms: elapsed_ms?,
            calories,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "#date={}#time={}#calories={}#type={}#spmax=0#version=4{}",
            self.start_ms,
            self.elapsed_ms,
            self.calories.unwrap_or(0),
            TYPE_HEART_RATE,
            EXTENSION
        )
    }
}

/// Read a `#calories=N#` segment from any file name, conventional or not
pub fn calories_in_name(path: &str) -> Option<u32> {
    base_name(path)
        .split('#')
        .find_map(|segment| segment.strip_prefix("calories="))
        .and_then(|value| value.parse().ok())
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
