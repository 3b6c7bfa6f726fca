pub mod catalog;
pub mod generation;
pub mod messages;
pub mod sandbox;
pub mod settings;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::catalog::{Category, GameDescriptor, GameSource};
    use crate::generation::{GameGenerator, GenerateError, GenerationRequest, GenerationResult};
    use crate::messages::HostMessage;
    use crate::sandbox::{IsolatedContext, ResourceHandle, ResourceStore};

    /// Build a catalog entry with the given id and source.
    pub fn make_game(id: &str, source: GameSource) -> GameDescriptor {
        GameDescriptor {
            id: id.to_string(),
            title: format!("Game {id}"),
            description: format!("Test game {id}"),
            thumbnail: format!("https://example.com/{id}.png"),
            category: Category::Arcade,
            tags: vec!["test".to_string()],
            source,
        }
    }

    #[derive(Default)]
    struct StoreInner {
        live: HashMap<ResourceHandle, (String, &'static str)>,
        minted: usize,
        revoked: usize,
        double_revokes: usize,
    }

    /// In-memory `ResourceStore` that counts mints and revocations.
    #[derive(Clone, Default)]
    pub struct CountingStore {
        inner: Arc<Mutex<StoreInner>>,
    }

    impl CountingStore {
        pub fn live(&self) -> usize {
            self.inner.lock().unwrap().live.len()
        }

        pub fn minted(&self) -> usize {
            self.inner.lock().unwrap().minted
        }

        pub fn revoked(&self) -> usize {
            self.inner.lock().unwrap().revoked
        }

        pub fn double_revokes(&self) -> usize {
            self.inner.lock().unwrap().double_revokes
        }

        pub fn content(&self, handle: &ResourceHandle) -> Option<String> {
            self.inner
                .lock()
                .unwrap()
                .live
                .get(handle)
                .map(|(c, _)| c.clone())
        }

        pub fn mime(&self, handle: &ResourceHandle) -> Option<&'static str> {
            self.inner.lock().unwrap().live.get(handle).map(|(_, m)| *m)
        }
    }

    impl ResourceStore for CountingStore {
        fn mint(&self, content: &str, mime: &'static str) -> ResourceHandle {
            let handle = ResourceHandle::new();
            let mut inner = self.inner.lock().unwrap();
            inner.minted += 1;
            inner.live.insert(handle, (content.to_string(), mime));
            handle
        }

        fn revoke(&self, handle: &ResourceHandle) -> bool {
            let mut inner = self.inner.lock().unwrap();
            if inner.live.remove(handle).is_some() {
                inner.revoked += 1;
                true
            } else {
                inner.double_revokes += 1;
                false
            }
        }

        fn address(&self, handle: &ResourceHandle) -> String {
            format!("mem://{handle}")
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ContextEvent {
        Navigate(String),
        Blank,
    }

    #[derive(Default)]
    struct ContextInner {
        events: Vec<ContextEvent>,
        ready: bool,
        delivered: Vec<HostMessage>,
    }

    /// `IsolatedContext` that records navigation and models listener readiness:
    /// every navigation starts a fresh document that drops messages until
    /// `signal_ready` is called.
    #[derive(Clone, Default)]
    pub struct RecordingContext {
        inner: Arc<Mutex<ContextInner>>,
    }

    impl RecordingContext {
        pub fn events(&self) -> Vec<ContextEvent> {
            self.inner.lock().unwrap().events.clone()
        }

        pub fn delivered(&self) -> Vec<HostMessage> {
            self.inner.lock().unwrap().delivered.clone()
        }

        pub fn signal_ready(&self) {
            self.inner.lock().unwrap().ready = true;
        }
    }

    impl IsolatedContext for RecordingContext {
        fn navigate(&mut self, address: &str) {
            let mut inner = self.inner.lock().unwrap();
            inner.ready = false;
            inner.events.push(ContextEvent::Navigate(address.to_string()));
        }

        fn blank(&mut self) {
            let mut inner = self.inner.lock().unwrap();
            inner.ready = false;
            inner.events.push(ContextEvent::Blank);
        }

        fn post_message(&self, message: &HostMessage) {
            let mut inner = self.inner.lock().unwrap();
            if inner.ready {
                inner.delivered.push(message.clone());
            }
        }
    }

    /// Generator that returns a fixed outcome and counts calls.
    pub struct StubGenerator {
        outcome: Result<GenerationResult, GenerateError>,
        calls: AtomicUsize,
    }

    impl StubGenerator {
        pub fn succeeding(code: &str, explanation: &str) -> Self {
            Self {
                outcome: Ok(GenerationResult {
                    code: code.to_string(),
                    explanation: explanation.to_string(),
                }),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                outcome: Err(GenerateError::failed(message)),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GameGenerator for StubGenerator {
        async fn generate_game(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResult, GenerateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }
}
