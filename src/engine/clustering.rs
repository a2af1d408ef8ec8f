// ==========================================
// 智能配送路由系统 - K-Means 聚类
// ==========================================
// 算法: k-means++ 初始化 + Lloyd 迭代,目标为最小化簇内平方距离和
// 确定性: 固定种子的 StdRng;同输入同种子 → 同划分
// 空簇修复: 从成员数 > 1 的簇中取离中心最远的点,保证 n >= k 时 k 个簇均非空
// ==========================================

use crate::engine::error::ClusteringError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Point = [f64; 2];

/// 聚类参数
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

/// 聚类结果
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// 与输入点一一对应的簇编号 0..k-1
    pub labels: Vec<usize>,
    pub centroids: Vec<Point>,
    pub inertia: f64,
    pub iterations: usize,
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    d0 * d0 + d1 * d1
}

/// 最近中心(距离相同取编号小者)
fn nearest_centroid(point: &Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best_distance {
            best = idx;
            best_distance = d;
        }
    }
    best
}

/// 执行 k-means
///
/// 前置条件: 1 <= k <= points.len()
pub fn kmeans(points: &[Point], params: &KMeansParams) -> Result<KMeansResult, ClusteringError> {
    if points.is_empty() {
        return Err(ClusteringError::EmptyValidSet);
    }
    if params.k == 0 {
        return Err(ClusteringError::ZeroTrucks);
    }
    if params.k > points.len() {
        return Err(ClusteringError::TooManyTrucks {
            num_trucks: params.k,
            stops: points.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let tolerance = scaled_tolerance(points, params.tolerance);

    let mut best: Option<KMeansResult> = None;
    for _ in 0..params.n_init.max(1) {
        let initial = kmeans_plus_plus(points, params.k, &mut rng);
        let run = lloyd(points, initial, params.max_iterations.max(1), tolerance);
        let better = best.as_ref().map_or(true, |b| run.inertia < b.inertia);
        if better {
            best = Some(run);
        }
    }

    best.ok_or(ClusteringError::EmptyValidSet)
}

/// 收敛阈值按各维方差均值缩放
fn scaled_tolerance(points: &[Point], tolerance: f64) -> f64 {
    let n = points.len() as f64;
    let mut variance_sum = 0.0;
    for dim in 0..2 {
        let mean = points.iter().map(|p| p[dim]).sum::<f64>() / n;
        variance_sum += points.iter().map(|p| (p[dim] - mean).powi(2)).sum::<f64>() / n;
    }
    (variance_sum / 2.0) * tolerance
}

/// k-means++ 初始中心
fn kmeans_plus_plus(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let n = points.len();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));

    let mut min_distances: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[chosen[0]]))
        .collect();

    while chosen.len() < k {
        let total: f64 = min_distances.iter().sum();

        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut picked = None;
            for (idx, d) in min_distances.iter().enumerate() {
                cumulative += d;
                if *d > 0.0 && cumulative >= target {
                    picked = Some(idx);
                    break;
                }
            }
            // 浮点累加误差兜底: 取最后一个距离为正的点
            picked.or_else(|| min_distances.iter().rposition(|d| *d > 0.0))
        } else {
            None
        };

        // 所有点与已选中心重合: 取第一个未选下标
        let next = next
            .or_else(|| (0..n).find(|idx| !chosen.contains(idx)))
            .unwrap_or(0);

        chosen.push(next);
        for (idx, p) in points.iter().enumerate() {
            let d = squared_distance(p, &points[next]);
            if d < min_distances[idx] {
                min_distances[idx] = d;
            }
        }
    }

    chosen.into_iter().map(|idx| points[idx]).collect()
}

/// 最近中心分配 + 空簇修复
fn assign_labels(points: &[Point], centroids: &[Point], labels: &mut [usize]) {
    let k = centroids.len();
    for (label, point) in labels.iter_mut().zip(points) {
        *label = nearest_centroid(point, centroids);
    }

    let mut counts = vec![0usize; k];
    for label in labels.iter() {
        counts[*label] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| counts[**label] > 1)
            .map(|(idx, label)| (idx, squared_distance(&points[idx], &centroids[*label])))
            .fold(None, |best: Option<(usize, f64)>, (idx, d)| match best {
                Some((_, best_d)) if best_d >= d => best,
                _ => Some((idx, d)),
            });

        if let Some((idx, _)) = donor {
            counts[labels[idx]] -= 1;
            labels[idx] = empty;
            counts[empty] += 1;
        }
    }
}

fn compute_centroids(points: &[Point], labels: &[usize], previous: &[Point]) -> Vec<Point> {
    let k = previous.len();
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];
    for (point, label) in points.iter().zip(labels) {
        sums[*label][0] += point[0];
        sums[*label][1] += point[1];
        counts[*label] += 1;
    }

    (0..k)
        .map(|c| {
            if counts[c] == 0 {
                previous[c]
            } else {
                [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64]
            }
        })
        .collect()
}

fn lloyd(points: &[Point], mut centroids: Vec<Point>, max_iterations: usize, tolerance: f64) -> KMeansResult {
    let mut labels = vec![0usize; points.len()];
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;
        assign_labels(points, &centroids, &mut labels);
        let updated = compute_centroids(points, &labels, &centroids);
        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if shift <= tolerance {
            break;
        }
    }

    // 以最终中心重新分配,保证标签与中心一致
    assign_labels(points, &centroids, &mut labels);
    let centroids = compute_centroids(points, &labels, &centroids);

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, l)| squared_distance(p, &centroids[*l]))
        .sum();

    KMeansResult {
        labels,
        centroids,
        inertia,
        iterations,
    }
}
