//! 模拟结果缓存：三个独立键空间（单次 / 对比 / 批量）
//!
//! 每次 put 之后先清理过期条目，再按插入顺序淘汰到容量以内（FIFO，不是 LRU）。
//! get 遇到过期条目会立即删除。
use crate::models::domain::contract::Network;
use crate::models::domain::request::BlockRef;
use crate::models::domain::result::{BatchResult, ComparisonResult, SimulationResult};
use crate::log_debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    inserted_at: Instant,
    network: Network,
    /// 插入序号，时间相同时保证 FIFO 顺序
    seq: u64,
}

#[derive(Debug)]
struct KeySpace<T> {
    entries: HashMap<String, CacheEntry<T>>,
    next_seq: u64,
}

impl<T: Clone> KeySpace<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    fn get(&mut self, key: &str, ttl: Duration) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() >= ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            log_debug!("缓存过期: {}", key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    fn put(&mut self, key: String, value: T, network: Network, ttl: Duration, capacity: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                network,
                seq,
            },
        );

        self.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);

        if self.entries.len() > capacity {
            let mut order: Vec<(u64, String)> = self
                .entries
                .iter()
                .map(|(k, e)| (e.seq, k.clone()))
                .collect();
            order.sort_unstable();
            let excess = self.entries.len() - capacity;
            for (_, key) in order.into_iter().take(excess) {
                self.entries.remove(&key);
            }
        }
    }

    fn clear_for_network(&mut self, network: Network) {
        self.entries.retain(|_, e| e.network != network);
    }
}

pub struct ResultCache {
    ttl: Duration,
    capacity: usize,
    single: Mutex<KeySpace<SimulationResult>>,
    comparison: Mutex<KeySpace<Vec<ComparisonResult>>>,
    batch: Mutex<KeySpace<BatchResult>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub single: usize,
    pub comparison: usize,
    pub batch: usize,
}

// 缓存内容可以重建，锁中毒时继续使用内部数据
fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            single: Mutex::new(KeySpace::new()),
            comparison: Mutex::new(KeySpace::new()),
            batch: Mutex::new(KeySpace::new()),
        }
    }

    pub fn get_single(&self, key: &str) -> Option<SimulationResult> {
        locked(&self.single).get(key, self.ttl)
    }

    pub fn put_single(&self, key: String, value: SimulationResult) {
        let network = value.request.network;
        locked(&self.single).put(key, value, network, self.ttl, self.capacity);
    }

    pub fn get_comparison(&self, key: &str) -> Option<Vec<ComparisonResult>> {
        locked(&self.comparison).get(key, self.ttl)
    }

    pub fn put_comparison(&self, key: String, network: Network, value: Vec<ComparisonResult>) {
        locked(&self.comparison).put(key, value, network, self.ttl, self.capacity);
    }

    pub fn get_batch(&self, key: &str) -> Option<BatchResult> {
        locked(&self.batch).get(key, self.ttl)
    }

    pub fn put_batch(&self, key: String, network: Network, value: BatchResult) {
        locked(&self.batch).put(key, value, network, self.ttl, self.capacity);
    }

    pub fn clear(&self) {
        locked(&self.single).entries.clear();
        locked(&self.comparison).entries.clear();
        locked(&self.batch).entries.clear();
    }

    pub fn clear_for_network(&self, network: Network) {
        locked(&self.single).clear_for_network(network);
        locked(&self.comparison).clear_for_network(network);
        locked(&self.batch).clear_for_network(network);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            single: locked(&self.single).entries.len(),
            comparison: locked(&self.comparison).entries.len(),
            batch: locked(&self.batch).entries.len(),
        }
    }
}

/// 缓存键：`{kind}:{operation}:{caller}:{canonical args}:{network}:{block}`
///
/// 参数先转成 JSON 并递归按键排序，键顺序不同的同一结构得到相同的指纹。
pub fn fingerprint<A: Serialize>(
    kind: &str,
    operation: &str,
    caller: &str,
    args: &A,
    network: Network,
    block: &BlockRef,
) -> String {
    let args = serde_json::to_value(args)
        .map(|v| canonical_json(&v).to_string())
        .unwrap_or_default();
    format!(
        "{}:{}:{}:{}:{}:{}",
        kind,
        operation,
        caller.trim().to_lowercase(),
        args,
        network,
        block
    )
}

fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical_json(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        other => other.clone(),
    }
}
