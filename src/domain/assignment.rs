// ==========================================
// 智能配送路由系统 - 车辆分配结果
// ==========================================
// 职责: 站点 → 车辆编号 → 司机 映射,调度起点
// 说明: 分配结果记录生成时的坐标快照,坐标变化即失效
// ==========================================

use crate::domain::stop::{Coordinates, Stop, StopId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 单个站点的分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckSlot {
    /// 车辆编号 0..num_trucks-1
    pub truck_id: usize,
    /// 分配时的坐标快照
    pub coordinates: Coordinates,
}

// ==========================================
// Assignment - 聚类分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub num_trucks: usize,
    pub seed: u64,
    /// 簇内平方距离和
    pub inertia: f64,
    slots: BTreeMap<StopId, TruckSlot>,
}

impl Assignment {
    pub fn new(num_trucks: usize, seed: u64, inertia: f64, slots: BTreeMap<StopId, TruckSlot>) -> Self {
        Self {
            num_trucks,
            seed,
            inertia,
            slots,
        }
    }

    pub fn truck_of(&self, stop: StopId) -> Option<usize> {
        self.slots.get(&stop).map(|s| s.truck_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// (站点, 车辆编号) 按站点顺序
    pub fn iter(&self) -> impl Iterator<Item = (StopId, usize)> + '_ {
        self.slots.iter().map(|(id, slot)| (*id, slot.truck_id))
    }

    /// 某辆车负责的站点
    pub fn stops_for_truck(&self, truck_id: usize) -> Vec<StopId> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.truck_id == truck_id)
            .map(|(id, _)| *id)
            .collect()
    }

    /// 实际出现的车辆编号
    pub fn distinct_trucks(&self) -> BTreeSet<usize> {
        self.slots.values().map(|s| s.truck_id).collect()
    }

    /// 校验分配是否仍与当前站点坐标一致
    ///
    /// 任一已分配站点坐标变化/缺失 → 失效
    pub fn is_current_for(&self, stops: &[Stop]) -> bool {
        self.slots.iter().all(|(id, slot)| {
            stops
                .get(id.index())
                .and_then(|s| s.coordinates())
                .map(|c| c == slot.coordinates)
                .unwrap_or(false)
        })
    }
}

// ==========================================
// DriverRoster - 车辆编号 → 司机名称
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRoster {
    labels: Vec<String>,
}

impl DriverRoster {
    /// 默认名称: "Truck 1" .. "Truck n"
    pub fn numbered(num_trucks: usize) -> Self {
        Self {
            labels: (1..=num_trucks).map(|i| format!("Truck {}", i)).collect(),
        }
    }

    /// 按输入名称构造,空白或缺失的位置用 "Driver i" 补齐,多余的名称丢弃
    pub fn from_names<S: AsRef<str>>(names: &[S], num_trucks: usize) -> Self {
        let labels = (0..num_trucks)
            .map(|i| {
                names
                    .get(i)
                    .map(|n| n.as_ref().trim())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Driver {}", i + 1))
            })
            .collect();
        Self { labels }
    }

    pub fn label(&self, truck_id: usize) -> Option<&str> {
        self.labels.get(truck_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ==========================================
// DispatchPoint - 调度起点(地图锚点)
// ==========================================
// 与聚类无关,仅供地图渲染使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPoint {
    pub query: String,
    pub coordinates: Coordinates,
    pub label: String,
}
