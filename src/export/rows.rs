// ==========================================
// 智能配送路由系统 - 导出行构建
// ==========================================
// 输入: 已完成分配的会话 + 司机名单
// 输出: 每个已分配站点一行(按站点顺序),附车辆编号与司机
// ==========================================

use crate::domain::assignment::DriverRoster;
use crate::domain::stop::StopId;
use crate::engine::workflow::WorkflowContext;
use crate::export::error::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 导出行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub stop_id: StopId,
    pub client: String,
    /// 原始地址(操作员修正过的以修正文本为准)
    pub address: String,
    pub resolved_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weight_kg: f64,
    /// 车辆编号 0..k-1
    pub truck_id: usize,
    /// 展示用车辆编号 1..k
    pub truck_number: usize,
    pub driver: String,
    /// 导入时模板外的列
    pub extra_fields: BTreeMap<String, String>,
}

/// 构建导出行
///
/// # 参数
/// - ctx: 已完成分配的会话
/// - roster: 司机名单,长度必须等于车辆数
pub fn build_rows(ctx: &WorkflowContext, roster: &DriverRoster) -> ExportResult<Vec<ExportRow>> {
    let assignment = ctx.assignment().ok_or(ExportError::MissingAssignment)?;
    if roster.len() != assignment.num_trucks {
        return Err(ExportError::RosterMismatch {
            roster: roster.len(),
            num_trucks: assignment.num_trucks,
        });
    }

    let mut rows = Vec::with_capacity(assignment.len());
    for (stop_id, truck_id) in assignment.iter() {
        let stop = ctx.stop(stop_id).ok_or(ExportError::StopNotFound(stop_id))?;
        let location = stop
            .location()
            .ok_or(ExportError::MissingCoordinates(stop_id))?;

        rows.push(ExportRow {
            stop_id,
            client: stop.client.clone(),
            address: stop
                .fixed_address
                .clone()
                .unwrap_or_else(|| stop.raw_address.clone()),
            resolved_address: location.label.clone(),
            latitude: location.coordinates.latitude,
            longitude: location.coordinates.longitude,
            weight_kg: stop.weight_kg,
            truck_id,
            truck_number: truck_id + 1,
            driver: roster
                .label(truck_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Truck {}", truck_id + 1)),
            extra_fields: stop.extra_fields.clone(),
        });
    }

    Ok(rows)
}

/// 所有行出现过的额外列(排序去重)
pub fn extra_columns(rows: &[ExportRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|r| r.extra_fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 各车辆装载汇总: (车辆编号, 司机, 站点数, 总重量)
pub fn truck_summary(rows: &[ExportRow]) -> Vec<(usize, String, usize, f64)> {
    let mut summary: BTreeMap<usize, (String, usize, f64)> = BTreeMap::new();
    for row in rows {
        let entry = summary
            .entry(row.truck_number)
            .or_insert_with(|| (row.driver.clone(), 0, 0.0));
        entry.1 += 1;
        entry.2 += row.weight_kg;
    }
    summary
        .into_iter()
        .map(|(truck, (driver, stops, weight))| (truck, driver, stops, weight))
        .collect()
}
