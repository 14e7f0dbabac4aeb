use thiserror::Error;

/// The query run on the compute host (or its node) to list GPUs.
pub const GPU_QUERY_COMMAND: &str = "nvidia-smi --query-gpu=timestamp,name,temperature.gpu,utilization.gpu,utilization.memory,memory.total,memory.free,memory.used --format=csv";

/// Devices using less memory than this are considered idle.
pub const FREE_GPU_MEMORY_THRESHOLD_MIB: u64 = 120;

#[derive(Debug, Error)]
pub enum GpuTableError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{0}' is missing from the nvidia-smi output")]
    MissingColumn(&'static str),
    #[error("Row {row}: cannot read '{value}' as a number for column '{column}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// One row of the `nvidia-smi` table. The index is the row position, which is the CUDA
/// device ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuDevice {
    pub index: u32,
    pub name: String,
    pub total_mib: u64,
    pub free_mib: u64,
    pub used_mib: u64,
    pub utilization_percent: Option<u32>,
}

/// Parses the CSV emitted by [`GPU_QUERY_COMMAND`].
///
/// Columns are located by header name, so extra or reordered columns are tolerated.
/// Numeric cells carry units (`"11178 MiB"`, `"3 %"`); only the leading number is kept.
pub fn parse_gpu_table(text: &str) -> Result<Vec<GpuDevice>, GpuTableError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |key: &'static str| {
        headers
            .iter()
            .position(|h| h == key || h.starts_with(&format!("{key} ")))
            .ok_or(GpuTableError::MissingColumn(key))
    };
    let name_col = column("name")?;
    let total_col = column("memory.total")?;
    let free_col = column("memory.free")?;
    let used_col = column("memory.used")?;
    let util_col = column("utilization.gpu").ok();

    let mut devices = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |col: usize| record.get(col).unwrap_or("");
        let number = |col: usize, name: &'static str| {
            leading_number(cell(col)).ok_or_else(|| GpuTableError::InvalidValue {
                row,
                column: name,
                value: cell(col).to_string(),
            })
        };

        devices.push(GpuDevice {
            index: row as u32,
            name: cell(name_col).to_string(),
            total_mib: number(total_col, "memory.total")?,
            free_mib: number(free_col, "memory.free")?,
            used_mib: number(used_col, "memory.used")?,
            utilization_percent: util_col
                .and_then(|col| leading_number(cell(col)))
                .map(|v| v as u32),
        });
    }
    Ok(devices)
}

/// Picks the device with the least used memory among those under `threshold_mib`.
/// Ties go to the lower index. `None` when every device is busy.
pub fn select_free_gpu(devices: &[GpuDevice], threshold_mib: u64) -> Option<u32> {
    devices
        .iter()
        .filter(|d| d.used_mib < threshold_mib)
        .min_by_key(|d| (d.used_mib, d.index))
        .map(|d| d.index)
}

fn leading_number(cell: &str) -> Option<u64> {
    let digits: String = cell
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
