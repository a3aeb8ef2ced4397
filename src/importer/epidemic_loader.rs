// ==========================================
// 疫苗分配优化系统 - 疫情快照加载器
// ==========================================
// 职责: 原始表格 -> EpidemicSnapshot
// 规则:
// 1) 必需列: Time, S1, I1, Q1, V11, V21, R1, S2, I2, Q2, V12, V22, R2
// 2) 所有单元格必须为数值
// 3) 守恒律漂移只告警，不中止
// ==========================================

use crate::domain::epidemic::{CompartmentSizes, EpidemicRow, EpidemicSnapshot, CONSERVATION_TOLERANCE};
use crate::domain::types::{Compartment, GroupId, NUM_GROUPS};
use crate::importer::error::{DataFormatError, ImportResult};
use crate::importer::file_parser::{RawTable, UniversalFileParser};
use std::path::Path;
use tracing::{info, instrument, warn};

/// 必需列（按输入文件约定的顺序）
pub fn required_columns() -> Vec<String> {
    let mut columns = vec!["Time".to_string()];
    for group in GroupId::ALL {
        for compartment in Compartment::ALL {
            columns.push(compartment.column_name(group));
        }
    }
    columns
}

// ==========================================
// EpidemicSnapshotStore - 快照加载入口
// ==========================================
pub struct EpidemicSnapshotStore;

impl EpidemicSnapshotStore {
    /// 从 CSV / Excel 文件加载
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<EpidemicSnapshot> {
        let table = UniversalFileParser.parse(path.as_ref())?;
        let snapshot = Self::from_table(&table)?;
        info!(time_points = snapshot.len(), "疫情数据加载完成");
        Ok(snapshot)
    }

    /// 从原始表格构造快照
    pub fn from_table(table: &RawTable) -> ImportResult<EpidemicSnapshot> {
        let required = required_columns();
        let missing: Vec<String> = required
            .iter()
            .filter(|c| table.column_index(c).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DataFormatError::MissingColumns(missing));
        }

        let time_col = table.column_index("Time").unwrap_or(0);
        let mut column_of = [[0usize; 6]; NUM_GROUPS];
        for group in GroupId::ALL {
            for (k, compartment) in Compartment::ALL.iter().enumerate() {
                column_of[group.index()][k] = table
                    .column_index(&compartment.column_name(group))
                    .unwrap_or(0);
            }
        }

        let mut rows = Vec::with_capacity(table.rows.len());
        for row_idx in 0..table.rows.len() {
            // 行号按表格显示（表头为第 1 行）
            let display_row = row_idx + 2;
            let time = parse_number(table, row_idx, time_col, display_row, "Time")?;

            let mut groups = [CompartmentSizes::default(); NUM_GROUPS];
            for group in GroupId::ALL {
                let cols = column_of[group.index()];
                let mut values = [0.0f64; 6];
                for (k, compartment) in Compartment::ALL.iter().enumerate() {
                    values[k] = parse_number(
                        table,
                        row_idx,
                        cols[k],
                        display_row,
                        &compartment.column_name(group),
                    )?;
                }
                groups[group.index()] = CompartmentSizes {
                    susceptible: values[0],
                    infected: values[1],
                    quarantined: values[2],
                    vaccinated1: values[3],
                    vaccinated2: values[4],
                    recovered: values[5],
                };
            }
            rows.push(EpidemicRow { time, groups });
        }

        let snapshot = EpidemicSnapshot::from_rows(rows).map_err(|e| e.with_row_offset(1))?;

        if !snapshot.is_conserved() {
            warn!(
                drift_group1 = snapshot.conservation_drift(GroupId::Group1),
                drift_group2 = snapshot.conservation_drift(GroupId::Group2),
                tolerance = CONSERVATION_TOLERANCE,
                "仓室总人口不守恒，请检查输入数据"
            );
        }

        Ok(snapshot)
    }
}

fn parse_number(
    table: &RawTable,
    row_idx: usize,
    col_idx: usize,
    display_row: usize,
    column: &str,
) -> ImportResult<f64> {
    let raw = table.cell(row_idx, col_idx);
    raw.parse::<f64>().map_err(|_| DataFormatError::NonNumeric {
        row: display_row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}
