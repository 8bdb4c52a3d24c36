use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Trait that any stored document must implement to be managed by ResourceActor.
///
/// Hooks run inside the actor, one message at a time, so every hook is an
/// atomic read-modify-write of a single document.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Ord + Clone + Send + Sync + Display + Debug + 'static;
    type CreateParams: Send + Sync + Debug + 'static;
    type Patch: Send + Sync + Debug + 'static;

    // --- Custom Actions ---
    type Action: Send + Sync + Debug + 'static;
    type ActionResult: Send + Sync + Debug + 'static;

    /// Get the ID of the entity
    fn id(&self) -> &Self::Id;

    /// Construct the full Entity from the ID and creation parameters
    fn from_create(id: Self::Id, params: Self::CreateParams) -> Result<Self, String>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), String> { Ok(()) }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), String>;
    fn on_delete(&self) -> Result<(), String> { Ok(()) }

    // --- Action Handler ---

    /// Handle a custom domain-specific action
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, String>;
}

/// Failures of the store layer itself, as opposed to domain outcomes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;
pub type Filter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Query {
        filter: Filter<T>,
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<()>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    /// Create the document from `params` if it is absent, then apply `action`.
    Upsert {
        id: T::Id,
        params: T::CreateParams,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    #[instrument(name = "resource_actor", skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn run(mut self) {
        info!("Actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create(params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).cloned()));
                }
                ResourceRequest::Query { filter, respond_to } => {
                    let items = self.store.values().filter(|item| filter(item)).cloned().collect();
                    let _ = respond_to.send(Ok(items));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let _ = respond_to.send(self.handle_update(id, patch));
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(id));
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let _ = respond_to.send(self.handle_action(id, action));
                }
                ResourceRequest::Upsert { id, params, action, respond_to } => {
                    let _ = respond_to.send(self.handle_upsert(id, params, action));
                }
            }
        }
        info!("Actor stopped");
    }

    fn handle_create(&mut self, params: T::CreateParams) -> Result<T, FrameworkError> {
        let id = (self.next_id_fn)();
        let mut item = T::from_create(id, params).map_err(FrameworkError::Rejected)?;
        item.on_create().map_err(FrameworkError::Rejected)?;
        debug!(id = %item.id(), "Created");
        self.store.insert(item.id().clone(), item.clone());
        Ok(item)
    }

    // Mutations are applied to a draft and committed only when the hook succeeds.

    fn handle_update(&mut self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        let item = self
            .store
            .get_mut(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;
        let mut draft = item.clone();
        draft.on_update(patch).map_err(FrameworkError::Rejected)?;
        *item = draft;
        Ok(item.clone())
    }

    fn handle_delete(&mut self, id: T::Id) -> Result<(), FrameworkError> {
        let item = self
            .store
            .get(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;
        item.on_delete().map_err(FrameworkError::Rejected)?;
        self.store.remove(&id);
        Ok(())
    }

    fn handle_action(&mut self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        let item = self
            .store
            .get_mut(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;
        let mut draft = item.clone();
        let result = draft.handle_action(action).map_err(FrameworkError::Rejected)?;
        *item = draft;
        Ok(result)
    }

    fn handle_upsert(
        &mut self,
        id: T::Id,
        params: T::CreateParams,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        let mut draft = match self.store.get(&id) {
            Some(existing) => existing.clone(),
            None => {
                let mut created = T::from_create(id.clone(), params).map_err(FrameworkError::Rejected)?;
                created.on_create().map_err(FrameworkError::Rejected)?;
                created
            }
        };
        let result = draft.handle_action(action).map_err(FrameworkError::Rejected)?;
        self.store.insert(id, draft);
        Ok(result)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
    timeout: Duration,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender, timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends a request and waits for the reply, both bounded by the client timeout.
    async fn call<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        let exchange = async {
            self.sender.send(build(respond_to)).await.map_err(|_| FrameworkError::ActorClosed)?;
            response.await.map_err(|_| FrameworkError::ActorDropped)?
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Store request timed out");
                Err(FrameworkError::Timeout(self.timeout))
            }
        }
    }

    /// Creates a document and returns it as stored.
    pub async fn create(&self, params: T::CreateParams) -> Result<T, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn query(
        &self,
        filter: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Result<Vec<T>, FrameworkError> {
        let filter: Filter<T> = Box::new(filter);
        self.call(|respond_to| ResourceRequest::Query { filter, respond_to }).await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Update { id, patch, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.call(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }

    pub async fn upsert_action(
        &self,
        id: T::Id,
        params: T::CreateParams,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Upsert { id, params, action, respond_to }).await
    }

    /// Only the enqueue is bounded by the timeout. Once the actor has accepted
    /// the request its outcome is always observed, so a caller never loses
    /// track of a mutation that did happen.
    async fn call_to_completion<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        match tokio::time::timeout(self.timeout, self.sender.send(build(respond_to))).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(FrameworkError::ActorClosed),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Store queue full, request not sent");
                return Err(FrameworkError::Timeout(self.timeout));
            }
        }
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create_to_completion(&self, params: T::CreateParams) -> Result<T, FrameworkError> {
        self.call_to_completion(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn perform_action_to_completion(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.call_to_completion(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        id: String,
        value: u32,
    }

    #[derive(Debug)]
    enum CounterAction {
        Decrement(u32),
    }

    impl Entity for Counter {
        type Id = String;
        type CreateParams = u32;
        type Patch = u32;
        type Action = CounterAction;
        type ActionResult = u32;

        fn id(&self) -> &String { &self.id }

        fn from_create(id: String, value: u32) -> Result<Self, String> {
            Ok(Self { id, value })
        }

        fn on_update(&mut self, value: u32) -> Result<(), String> {
            self.value = value;
            Ok(())
        }

        fn handle_action(&mut self, action: CounterAction) -> Result<u32, String> {
            match action {
                CounterAction::Decrement(amount) => {
                    // Mutate first so a rejected action proves the draft is discarded.
                    self.value = self.value.wrapping_sub(amount);
                    if self.value > 1_000 {
                        return Err("would underflow".to_string());
                    }
                    Ok(self.value)
                }
            }
        }
    }

    fn start() -> ResourceClient<Counter> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("counter_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::new(10, next_id);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let client = start();

        let id = client.create(5).await.unwrap().id;
        assert_eq!(id, "counter_1");

        assert_eq!(client.perform_action(id.clone(), CounterAction::Decrement(2)).await, Ok(3));

        let rejected = client.perform_action(id.clone(), CounterAction::Decrement(4)).await;
        assert!(matches!(rejected, Err(FrameworkError::Rejected(_))));

        let item = client.get(id.clone()).await.unwrap().unwrap();
        assert_eq!(item.value, 3);
    }

    #[tokio::test]
    async fn test_upsert_creates_missing_document_once() {
        let client = start();

        let first = client.upsert_action("fixed".to_string(), 10, CounterAction::Decrement(1)).await;
        assert_eq!(first, Ok(9));
        let second = client.upsert_action("fixed".to_string(), 10, CounterAction::Decrement(1)).await;
        assert_eq!(second, Ok(8));

        let all = client.query(|_| true).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_documents_report_not_found() {
        let client = start();

        assert_eq!(client.get("nope".to_string()).await, Ok(None));
        assert!(matches!(
            client.update("nope".to_string(), 1).await,
            Err(FrameworkError::NotFound(_))
        ));
        assert!(matches!(client.delete("nope".to_string()).await, Err(FrameworkError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_actor_is_reported() {
        let (sender, receiver) = mpsc::channel::<ResourceRequest<Counter>>(1);
        drop(receiver);
        let client = ResourceClient::new(sender);
        assert_eq!(client.get("x".to_string()).await, Err(FrameworkError::ActorClosed));
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        let (sender, _receiver) = mpsc::channel::<ResourceRequest<Counter>>(1);
        let client = ResourceClient::new(sender).with_timeout(Duration::from_millis(10));
        assert_eq!(
            client.get("x".to_string()).await,
            Err(FrameworkError::Timeout(Duration::from_millis(10)))
        );
    }
}
