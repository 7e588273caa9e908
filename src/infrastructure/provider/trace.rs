//! debug_traceCall (callTracer) 结果解析
use crate::errors::error::AppError;
use crate::models::domain::result::InternalCall;
use ethers_core::types::{Address, Bytes, H256, U256};
use serde::Deserialize;
use serde_json::{Value, json};

/// 展平后的执行轨迹
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallTrace {
    /// 顶层调用实际消耗的 gas
    pub gas_used: u64,
    /// 顶层以下的所有内部调用（深度优先顺序）
    pub calls: Vec<InternalCall>,
    /// 未被回滚的调用帧产生的日志
    pub logs: Vec<TraceLog>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<H256>,
    #[serde(default)]
    pub data: Bytes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallFrame {
    #[serde(rename = "type", default)]
    call_type: String,
    from: Address,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    value: Option<U256>,
    #[serde(default)]
    gas_used: U256,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    calls: Vec<CallFrame>,
    #[serde(default)]
    logs: Vec<TraceLog>,
}

/// callTracer 的 tracer 参数
pub fn call_tracer_options() -> Value {
    json!({
        "tracer": "callTracer",
        "tracerConfig": { "withLog": true, "onlyTopCall": false }
    })
}

/// 解析节点返回的顶层调用帧
pub fn parse_call_trace(raw: Value) -> Result<CallTrace, AppError> {
    let root: CallFrame = serde_json::from_value(raw)
        .map_err(|e| AppError::Trace(format!("无法解析调用轨迹: {}", e)))?;

    let mut trace = CallTrace {
        gas_used: root.gas_used.low_u64(),
        ..Default::default()
    };
    collect_logs(&root, &mut trace.logs);
    for child in &root.calls {
        flatten(child, 1, &mut trace.calls);
    }
    Ok(trace)
}

fn flatten(frame: &CallFrame, depth: usize, out: &mut Vec<InternalCall>) {
    out.push(InternalCall {
        call_type: frame.call_type.clone(),
        from: frame.from,
        to: frame.to,
        gas_used: frame.gas_used.low_u64(),
        value: frame.value.filter(|v| !v.is_zero()),
        error: frame.error.clone(),
        depth,
    });
    for child in &frame.calls {
        flatten(child, depth + 1, out);
    }
}

// 回滚帧（及其子帧）的日志不会上链
fn collect_logs(frame: &CallFrame, out: &mut Vec<TraceLog>) {
    if frame.error.is_some() {
        return;
    }
    out.extend(frame.logs.iter().cloned());
    for child in &frame.calls {
        collect_logs(child, out);
    }
}
