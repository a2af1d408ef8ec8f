// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供可编程的地理编码服务桩、测试文件生成等功能
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use smart_routing::config::DispatchConfig;
use smart_routing::domain::Coordinates;
use smart_routing::geocoder::{GeocodeError, GeocodeHit, GeocodeProvider, GeocodeResult, RegionFilter};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;

// ==========================================
// StubProvider - 按查询文本应答的地理编码服务
// ==========================================
pub struct StubProvider {
    name: String,
    answers: HashMap<String, GeocodeResult<GeocodeHit>>,
    suggestions: HashMap<String, Vec<String>>,
    resolve_calls: AtomicUsize,
    suggest_calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answers: HashMap::new(),
            suggestions: HashMap::new(),
            resolve_calls: AtomicUsize::new(0),
            suggest_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// 查询命中: label 即查询文本
    pub fn with_hit(mut self, query: &str, lat: f64, lon: f64) -> Self {
        let hit = GeocodeHit {
            coordinates: Coordinates::new(lat, lon),
            label: query.to_string(),
            provider: self.name.clone(),
        };
        self.answers.insert(query.to_string(), Ok(hit));
        self
    }

    /// 查询返回指定错误
    pub fn with_error(mut self, query: &str, error: GeocodeError) -> Self {
        self.answers.insert(query.to_string(), Err(error));
        self
    }

    /// 原始地址对应的候选地址
    pub fn with_suggestions(mut self, query: &str, suggestions: &[&str]) -> Self {
        self.suggestions.insert(
            query.to_string(),
            suggestions.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeocodeProvider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, query: &str) -> GeocodeResult<GeocodeHit> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.answers
            .get(query)
            .cloned()
            .unwrap_or_else(|| Err(GeocodeError::not_found(&self.name, query)))
    }

    async fn suggest(&self, query: &str, max_results: usize, _region: &RegionFilter) -> Vec<String> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        self.suggestions
            .get(query)
            .map(|s| s.iter().take(max_results).cloned().collect())
            .unwrap_or_default()
    }
}

// ==========================================
// 测试数据
// ==========================================

/// 写入临时 CSV 文件(需要保持存活)
pub fn write_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("创建临时文件失败");
    file.write_all(content.as_bytes()).expect("写入临时文件失败");
    file.flush().expect("刷新临时文件失败");
    file
}

/// 测试用配置: 隐式确认,修正上限 3,固定种子
pub fn test_config() -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.workflow.max_fix_attempts = Some(3);
    config.max_concurrency = 2;
    config
}

/// Cebu 市区附近的五个站点
pub const FIVE_STOPS_CSV: &str = "\
Client,Address,Order and Weight,Notes
Ayala Grocer,Cebu Business Park,12kg rice,gate 3
Colon Bakery,Colon Strt,3.5 KG flour,
Mandaue Hardware,Mandaue Hiway,heavy,call ahead
Talamban Pharmacy,Talamban Rd,8 kg,
Lapu Fishmart,Lapu-Lapu Pier,20kg fish,cold
";
