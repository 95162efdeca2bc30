use crate::client::SuggestClient;
use sotto_core::config::AssistConfig;
use sotto_core::SuggestionEvent;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ── SuggestLimits ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SuggestLimits {
    /// Minimum new transcript characters before another generation attempt.
    pub min_chars: usize,
    /// Minimum time between emitted suggestions.
    pub min_interval: Duration,
    /// How much of the buffer tail is sent to the generation client.
    pub snapshot_chars: usize,
    /// Upper bound on retained conversation text; oldest dropped first.
    pub max_context_chars: usize,
}

impl Default for SuggestLimits {
    fn default() -> Self {
        Self {
            min_chars: 120,
            min_interval: Duration::from_secs(7),
            snapshot_chars: 2000,
            max_context_chars: 8000,
        }
    }
}

impl From<&AssistConfig> for SuggestLimits {
    fn from(cfg: &AssistConfig) -> Self {
        Self {
            min_chars: cfg.min_chars,
            min_interval: Duration::from_secs(cfg.min_interval_secs),
            snapshot_chars: cfg.snapshot_chars,
            max_context_chars: cfg.max_context_chars,
        }
    }
}

// ── SuggestEngine ─────────────────────────────────────────────

struct ContextState {
    buffer: String,
    chars_since_emit: usize,
    last_emit_at: Option<Instant>,
    last_suggestion: Option<String>,
}

struct EngineInner {
    client: Arc<dyn SuggestClient>,
    limits: SuggestLimits,
    state: Mutex<ContextState>,
    events_tx: mpsc::UnboundedSender<SuggestionEvent>,
}

/// Accumulates transcript text from both sources into one rolling context
/// and decides when a suggestion is worth generating.
///
/// Emission is debounced on new-character volume, rate limited on time
/// since the last emitted suggestion, and deduplicated case-insensitively
/// against the previous one. Generation runs in background tasks so a slow
/// client never stalls the transcript path.
pub struct SuggestEngine {
    inner: Arc<EngineInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    events_rx: Option<mpsc::UnboundedReceiver<SuggestionEvent>>,
}

impl SuggestEngine {
    pub fn new(client: Arc<dyn SuggestClient>, limits: SuggestLimits) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(EngineInner {
                client,
                limits,
                state: Mutex::new(ContextState {
                    buffer: String::new(),
                    chars_since_emit: 0,
                    last_emit_at: None,
                    last_suggestion: None,
                }),
                events_tx,
            }),
            tasks: Mutex::new(Vec::new()),
            events_rx: Some(events_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SuggestionEvent>> {
        self.events_rx.take()
    }

    /// Feed one transcript line into the shared context. When enough new
    /// text has accumulated and the rate limit allows, a generation call
    /// is spawned in the background.
    pub fn process_ambient(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let context = {
            let Ok(mut state) = self.inner.state.lock() else {
                return;
            };
            state.buffer.push_str(text);
            state.buffer.push('\n');
            state.chars_since_emit += text.chars().count();
            bound_tail(&mut state.buffer, self.inner.limits.max_context_chars);

            if state.chars_since_emit < self.inner.limits.min_chars {
                return;
            }
            if let Some(at) = state.last_emit_at {
                if at.elapsed() < self.inner.limits.min_interval {
                    return;
                }
            }
            // Counter resets before the call goes out, not after it lands.
            state.chars_since_emit = 0;
            tail_chars(&state.buffer, self.inner.limits.snapshot_chars).to_string()
        };
        self.spawn_generation(context);
    }

    /// Generate from the current context right away, skipping both gates.
    /// The ambient counter is left untouched.
    pub fn force_generate(&self) {
        let context = {
            let Ok(state) = self.inner.state.lock() else {
                return;
            };
            tail_chars(&state.buffer, self.inner.limits.snapshot_chars).to_string()
        };
        if context.trim().is_empty() {
            return;
        }
        self.spawn_generation(context);
    }

    fn spawn_generation(&self, context: String) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let completion = match inner.client.complete(&context).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("suggestion generation failed: {e}");
                    return;
                }
            };
            let text = completion.trim();
            if text.is_empty() {
                return;
            }
            let Ok(mut state) = inner.state.lock() else {
                return;
            };
            if let Some(last) = &state.last_suggestion {
                if last.to_lowercase() == text.to_lowercase() {
                    return;
                }
            }
            state.last_suggestion = Some(text.to_string());
            state.last_emit_at = Some(Instant::now());
            let _ = inner.events_tx.send(SuggestionEvent {
                text: text.to_string(),
                at: SystemTime::now(),
            });
        });
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(task);
        }
    }

    /// Wait briefly for in-flight generation calls, then abort stragglers.
    pub async fn shutdown(&self) {
        let tasks = {
            let Ok(mut tasks) = self.tasks.lock() else {
                return;
            };
            std::mem::take(&mut *tasks)
        };
        for mut task in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                task.abort();
                let _ = task.await;
            }
        }
    }
}

/// Last `max_chars` characters of `s`, split on a char boundary.
fn tail_chars(s: &str, max_chars: usize) -> &str {
    let total = s.chars().count();
    if total <= max_chars {
        return s;
    }
    let start = s
        .char_indices()
        .nth(total - max_chars)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

fn bound_tail(buffer: &mut String, max_chars: usize) {
    if buffer.chars().count() <= max_chars {
        return;
    }
    let tail = tail_chars(buffer, max_chars).to_string();
    *buffer = tail;
}
