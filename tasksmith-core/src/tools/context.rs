//! `ExecutionContext`: transient per-invocation state created by the
//! executor and destroyed on return (`spec.md` §3).

/// Per-invocation context handed to a tool handler. Holds the counters'
/// values *as observed when the handler started*, not live references —
/// the monotonic totals themselves are mutated only inside the executor's
/// critical section (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub tool_name: String,
    pub session_id: String,
    pub per_prompt_count: u32,
    pub per_session_count: u32,
}
