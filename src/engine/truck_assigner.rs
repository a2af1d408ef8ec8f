// ==========================================
// 智能配送路由系统 - 车辆分配器
// ==========================================
// 职责: 将有效站点按坐标聚类为 k 组,组号即车辆编号
// 前置条件: 有效站点非空,1 <= k <= 有效站点数;不满足时报错,不截断 k
// 确定性: 站点按 StopId 排序后聚类,同输入同种子 → 同分配
// ==========================================

use crate::config::ClusteringConfig;
use crate::domain::assignment::{Assignment, TruckSlot};
use crate::domain::stop::{Stop, StopId};
use crate::engine::clustering::{kmeans, KMeansParams, Point};
use crate::engine::error::ClusteringError;
use std::collections::BTreeMap;
use tracing::{info, instrument};

pub struct TruckAssigner {
    config: ClusteringConfig,
}

impl TruckAssigner {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// 对有效站点执行聚类分配
    ///
    /// # 参数
    /// - stops: 有效站点(必须已有坐标)
    /// - num_trucks: 车辆数 k
    ///
    /// # 返回
    /// 每个站点一个车辆编号,编号集合恰为 0..k-1
    #[instrument(skip(self, stops), fields(stops = stops.len()))]
    pub fn assign(&self, stops: &[&Stop], num_trucks: usize) -> Result<Assignment, ClusteringError> {
        if stops.is_empty() {
            return Err(ClusteringError::EmptyValidSet);
        }
        if num_trucks == 0 {
            return Err(ClusteringError::ZeroTrucks);
        }
        if num_trucks > stops.len() {
            return Err(ClusteringError::TooManyTrucks {
                num_trucks,
                stops: stops.len(),
            });
        }

        let mut located = Vec::with_capacity(stops.len());
        for stop in stops {
            let coordinates = stop
                .coordinates()
                .ok_or(ClusteringError::MissingCoordinates(stop.id))?;
            located.push((stop.id, coordinates));
        }
        located.sort_by_key(|(id, _)| *id);

        let points: Vec<Point> = located
            .iter()
            .map(|(_, c)| [c.latitude, c.longitude])
            .collect();

        let params = KMeansParams {
            k: num_trucks,
            seed: self.config.seed,
            n_init: self.config.n_init,
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
        };
        let result = kmeans(&points, &params)?;

        let slots: BTreeMap<StopId, TruckSlot> = located
            .into_iter()
            .zip(result.labels)
            .map(|((id, coordinates), truck_id)| (id, TruckSlot { truck_id, coordinates }))
            .collect();

        info!(
            num_trucks,
            seed = self.config.seed,
            inertia = result.inertia,
            iterations = result.iterations,
            "车辆分配完成"
        );

        Ok(Assignment::new(num_trucks, self.config.seed, result.inertia, slots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stop::{Coordinates, RawStopRecord, ResolvedLocation};
    use std::collections::BTreeMap;

    fn located_stop(idx: usize, lat: f64, lon: f64) -> Stop {
        let mut stop = Stop::new(
            StopId(idx),
            RawStopRecord {
                row_number: idx + 2,
                client: format!("Client {}", idx),
                address: format!("Street {}", idx),
                weight_kg: 1.0,
                extra_fields: BTreeMap::new(),
            },
        );
        stop.mark_resolved(ResolvedLocation {
            coordinates: Coordinates::new(lat, lon),
            label: format!("Street {}, Cebu", idx),
            provider: "stub".to_string(),
        })
        .unwrap();
        stop
    }

    fn sample() -> Vec<Stop> {
        vec![
            located_stop(0, 10.30, 123.89),
            located_stop(1, 10.31, 123.90),
            located_stop(2, 10.70, 124.00),
            located_stop(3, 10.71, 124.01),
            located_stop(4, 10.32, 123.88),
        ]
    }

    #[test]
    fn test_assigns_every_stop_exactly_k_trucks() {
        let stops = sample();
        let refs: Vec<&Stop> = stops.iter().collect();
        let assigner = TruckAssigner::new(ClusteringConfig::default());

        let assignment = assigner.assign(&refs, 2).unwrap();

        assert_eq!(assignment.len(), 5);
        assert_eq!(assignment.distinct_trucks().into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(assignment.truck_of(StopId(0)), assignment.truck_of(StopId(4)));
        assert_eq!(assignment.truck_of(StopId(2)), assignment.truck_of(StopId(3)));
    }

    #[test]
    fn test_input_order_does_not_change_result() {
        let stops = sample();
        let forward: Vec<&Stop> = stops.iter().collect();
        let backward: Vec<&Stop> = stops.iter().rev().collect();
        let assigner = TruckAssigner::new(ClusteringConfig::default());

        assert_eq!(assigner.assign(&forward, 3).unwrap(), assigner.assign(&backward, 3).unwrap());
    }

    #[test]
    fn test_preconditions_reported() {
        let stops = sample();
        let refs: Vec<&Stop> = stops.iter().collect();
        let assigner = TruckAssigner::new(ClusteringConfig::default());

        assert_eq!(assigner.assign(&[], 1), Err(ClusteringError::EmptyValidSet));
        assert_eq!(assigner.assign(&refs, 0), Err(ClusteringError::ZeroTrucks));
        assert_eq!(
            assigner.assign(&refs, 6),
            Err(ClusteringError::TooManyTrucks { num_trucks: 6, stops: 5 })
        );
    }

    #[test]
    fn test_stop_without_coordinates_rejected() {
        let pending = Stop::new(
            StopId(9),
            RawStopRecord {
                row_number: 11,
                client: "X".to_string(),
                address: "Y".to_string(),
                weight_kg: 0.0,
                extra_fields: BTreeMap::new(),
            },
        );
        let assigner = TruckAssigner::new(ClusteringConfig::default());
        assert_eq!(
            assigner.assign(&[&pending], 1),
            Err(ClusteringError::MissingCoordinates(StopId(9)))
        );
    }
}
