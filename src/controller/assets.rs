// assets.rs - Fire-and-forget character loading with last-request-wins swaps
//
// Every load request takes a `LoadTicket` from the slot. Loads run in the
// background (a fetch task on wasm, a worker thread natively) and report back
// through a completion queue that the frame loop drains once per tick:
//
//   request A ──┐
//   request B ──┼── complete(A) → discarded, A dropped right away
//               └── complete(B) → applied, previous model dropped
//
// Only the most recently issued ticket can become the active model, whatever
// order the loads finish in.

use crate::config::AssetConfig;
use crate::error::AssetError;
use crate::model::CharacterModel;

/// Sequence number of a load request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Became the active value; `replaced` is the ticket it displaced
    Applied { replaced: Option<LoadTicket> },
    /// A newer request exists; the value was dropped
    Discarded { latest: LoadTicket },
}

/// Holds the active value of a sequence-numbered load stream
#[derive(Debug)]
pub struct AssetSlot<T> {
    next: u64,
    latest: Option<LoadTicket>,
    pending: bool,
    active: Option<(LoadTicket, T)>,
}

impl<T> AssetSlot<T> {
    pub fn new() -> Self {
        Self {
            next: 0,
            latest: None,
            pending: false,
            active: None,
        }
    }

    /// Issue the ticket for a new request; it supersedes all earlier ones
    pub fn request(&mut self) -> LoadTicket {
        self.next += 1;
        let ticket = LoadTicket(self.next);
        self.latest = Some(ticket);
        self.pending = true;
        ticket
    }

    pub fn is_latest(&self, ticket: LoadTicket) -> bool {
        self.latest == Some(ticket)
    }

    /// Whether the latest request has not resolved yet
    pub fn is_loading(&self) -> bool {
        self.pending
    }

    pub fn complete(&mut self, ticket: LoadTicket, value: T) -> SwapOutcome {
        match self.latest {
            Some(latest) if latest == ticket => {
                self.pending = false;
                let previous = self.active.replace((ticket, value));
                SwapOutcome::Applied {
                    replaced: previous.map(|(t, _)| t),
                }
            }
            latest => {
                drop(value);
                SwapOutcome::Discarded {
                    latest: latest.unwrap_or(ticket),
                }
            }
        }
    }

    /// A load failed; the active value stays. Returns whether it was the latest.
    pub fn fail(&mut self, ticket: LoadTicket) -> bool {
        let latest = self.is_latest(ticket);
        if latest {
            self.pending = false;
        }
        latest
    }

    pub fn active(&self) -> Option<&T> {
        self.active.as_ref().map(|(_, v)| v)
    }

    pub fn active_mut(&mut self) -> Option<&mut T> {
        self.active.as_mut().map(|(_, v)| v)
    }

    pub fn active_ticket(&self) -> Option<LoadTicket> {
        self.active.as_ref().map(|(t, _)| *t)
    }
}

impl<T> Default for AssetSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one background load
#[derive(Debug)]
pub struct LoadCompletion {
    pub ticket: LoadTicket,
    pub clip: String,
    pub result: Result<CharacterModel, AssetError>,
}

#[cfg(target_arch = "wasm32")]
type CompletionQueue = std::rc::Rc<std::cell::RefCell<Vec<LoadCompletion>>>;

/// Starts background loads and collects their completions
pub struct AssetLoader {
    config: AssetConfig,
    #[cfg(target_arch = "wasm32")]
    queue: CompletionQueue,
    #[cfg(not(target_arch = "wasm32"))]
    sender: std::sync::mpsc::Sender<LoadCompletion>,
    #[cfg(not(target_arch = "wasm32"))]
    receiver: std::sync::mpsc::Receiver<LoadCompletion>,
}

impl AssetLoader {
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }
}

/// Send a completion to the frame loop; false when the loader is gone
#[cfg(not(target_arch = "wasm32"))]
fn deliver(sender: &std::sync::mpsc::Sender<LoadCompletion>, completion: LoadCompletion) -> bool {
    match sender.send(completion) {
        Ok(()) => true,
        Err(std::sync::mpsc::SendError(unsent)) => {
            tracing::debug!(ticket = unsent.ticket.0, clip = %unsent.clip, "loader gone, completion dropped");
            false
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetLoader {
    pub fn new(config: AssetConfig) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel();
        Self {
            config,
            sender,
            receiver,
        }
    }

    /// Hand a finished load to the frame loop
    pub fn complete(&self, completion: LoadCompletion) {
        deliver(&self.sender, completion);
    }

    /// Completions received since the previous call, oldest first
    pub fn drain(&self) -> Vec<LoadCompletion> {
        self.receiver.try_iter().collect()
    }

    /// Start loading `clip` on a worker thread
    pub fn load(&self, ticket: LoadTicket, clip: &str) {
        let path = self.config.clip_path(clip);
        let clip = clip.to_string();
        let sender = self.sender.clone();
        tracing::info!(ticket = ticket.0, %clip, %path, "asset load requested");

        let spawned = std::thread::Builder::new()
            .name(format!("asset-{}", ticket.0))
            .spawn(move || {
                let result = std::fs::read(&path)
                    .map_err(|source| AssetError::Io { path, source })
                    .and_then(|bytes| CharacterModel::from_glb(&clip, &bytes));
                deliver(&sender, LoadCompletion { ticket, clip, result });
            });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to spawn asset loader thread");
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetLoader {
    pub fn new(config: AssetConfig) -> Self {
        Self {
            config,
            queue: CompletionQueue::default(),
        }
    }

    /// Hand a finished load to the frame loop
    pub fn complete(&self, completion: LoadCompletion) {
        self.queue.borrow_mut().push(completion);
    }

    /// Completions received since the previous call, oldest first
    pub fn drain(&self) -> Vec<LoadCompletion> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    /// Start fetching `clip` on the browser's task queue
    pub fn load(&self, ticket: LoadTicket, clip: &str) {
        let path = self.config.clip_path(clip);
        let clip = clip.to_string();
        let queue = self.queue.clone();
        tracing::info!(ticket = ticket.0, %clip, %path, "asset load requested");

        wasm_bindgen_futures::spawn_local(async move {
            let result = match fetch_bytes(&path).await {
                Ok(bytes) => CharacterModel::from_glb(&clip, &bytes),
                Err(reason) => Err(AssetError::Fetch { path, reason }),
            };
            queue.borrow_mut().push(LoadCompletion { ticket, clip, result });
        });
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let describe = |e: wasm_bindgen::JsValue| format!("{e:?}");
    let window = web_sys::window().ok_or_else(|| "no global `window`".to_string())?;
    let response = JsFuture::from(window.fetch_with_str(url)).await.map_err(describe)?;
    let response: web_sys::Response = response.dyn_into().map_err(describe)?;
    if !response.ok() {
        return Err(format!("HTTP {}", response.status()));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(describe)?)
        .await
        .map_err(describe)?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}
