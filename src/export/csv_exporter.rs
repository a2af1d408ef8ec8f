// ==========================================
// 智能配送路由系统 - CSV 导出
// ==========================================
// 列: 固定列 + 导入时的额外列(按列名排序)
// ==========================================

use crate::export::error::ExportResult;
use crate::export::rows::{extra_columns, ExportRow};
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const FIXED_COLUMNS: [&str; 8] = [
    "Client",
    "Address",
    "Resolved Address",
    "Latitude",
    "Longitude",
    "Weight (kg)",
    "Assigned Truck",
    "Driver",
];

// ==========================================
// ExportSink Trait - 导出协作方
// ==========================================
pub trait ExportSink: Send + Sync {
    fn export(&self, rows: &[ExportRow]) -> ExportResult<()>;
}

/// 写入任意 Writer
pub fn write_csv<W: Write>(writer: W, rows: &[ExportRow]) -> ExportResult<()> {
    let extras = extra_columns(rows);
    let mut csv_writer = WriterBuilder::new().from_writer(writer);

    let mut header: Vec<&str> = FIXED_COLUMNS.to_vec();
    header.extend(extras.iter().map(String::as_str));
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.client.clone(),
            row.address.clone(),
            row.resolved_address.clone(),
            row.latitude.to_string(),
            row.longitude.to_string(),
            row.weight_kg.to_string(),
            row.truck_number.to_string(),
            row.driver.clone(),
        ];
        for column in &extras {
            record.push(row.extra_fields.get(column).cloned().unwrap_or_default());
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub struct CsvExporter {
    output_path: PathBuf,
}

impl CsvExporter {
    pub fn new<P: AsRef<Path>>(output_path: P) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl ExportSink for CsvExporter {
    fn export(&self, rows: &[ExportRow]) -> ExportResult<()> {
        let file = File::create(&self.output_path)?;
        write_csv(file, rows)?;
        info!(path = %self.output_path.display(), rows = rows.len(), "导出完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stop::StopId;
    use std::collections::BTreeMap;

    fn row(idx: usize, truck_id: usize, extra: Option<(&str, &str)>) -> ExportRow {
        let mut extra_fields = BTreeMap::new();
        if let Some((k, v)) = extra {
            extra_fields.insert(k.to_string(), v.to_string());
        }
        ExportRow {
            stop_id: StopId(idx),
            client: format!("Client {}", idx),
            address: format!("Street {}", idx),
            resolved_address: format!("Street {}, Cebu City", idx),
            latitude: 10.3,
            longitude: 123.9,
            weight_kg: 12.5,
            truck_id,
            truck_number: truck_id + 1,
            driver: "Juan".to_string(),
            extra_fields,
        }
    }

    #[test]
    fn test_write_csv_headers_and_extras() {
        let rows = vec![row(0, 0, Some(("Start Time", "08:00"))), row(1, 1, None)];
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &rows).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Client,Address,Resolved Address,Latitude,Longitude,Weight (kg),Assigned Truck,Driver,Start Time"
        );
        assert_eq!(lines[1], "Client 0,Street 0,\"Street 0, Cebu City\",10.3,123.9,12.5,1,Juan,08:00");
        assert!(lines[2].ends_with(",2,Juan,"));
    }

    #[test]
    fn test_csv_exporter_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");
        let exporter = CsvExporter::new(&path);

        exporter.export(&[row(0, 0, None)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
