use episode_store::{ArtifactStore, WatchStateStore};

use crate::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    llm::Generator,
    messaging::{notifier::Notifier, MessagingChannel},
    negotiation::SelectionStrategy,
    EpisodeProcessor,
};

pub struct EpisodeProcessorBuilder<S = (), G = (), Y = (), W = (), M = (), C = SystemClock> {
    config: AppConfig,
    store: S,
    generator: G,
    strategy: Y,
    watch_store: W,
    notifier: Option<Notifier<M>>,
    clock: C,
}

impl EpisodeProcessorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: (),
            generator: (),
            strategy: (),
            watch_store: (),
            notifier: None,
            clock: SystemClock,
        }
    }
}

impl<S, G, Y, W, M, C> EpisodeProcessorBuilder<S, G, Y, W, M, C> {
    pub fn store<S2: ArtifactStore + Send + Sync>(
        self,
        store: S2,
    ) -> EpisodeProcessorBuilder<S2, G, Y, W, M, C> {
        EpisodeProcessorBuilder {
            config: self.config,
            store,
            generator: self.generator,
            strategy: self.strategy,
            watch_store: self.watch_store,
            notifier: self.notifier,
            clock: self.clock,
        }
    }

    pub fn generator<G2: Generator + Send + Sync>(
        self,
        generator: G2,
    ) -> EpisodeProcessorBuilder<S, G2, Y, W, M, C> {
        EpisodeProcessorBuilder {
            config: self.config,
            store: self.store,
            generator,
            strategy: self.strategy,
            watch_store: self.watch_store,
            notifier: self.notifier,
            clock: self.clock,
        }
    }

    pub fn strategy<Y2: SelectionStrategy + Send + Sync>(
        self,
        strategy: Y2,
    ) -> EpisodeProcessorBuilder<S, G, Y2, W, M, C> {
        EpisodeProcessorBuilder {
            config: self.config,
            store: self.store,
            generator: self.generator,
            strategy,
            watch_store: self.watch_store,
            notifier: self.notifier,
            clock: self.clock,
        }
    }

    pub fn watch_store<W2: WatchStateStore + Send + Sync>(
        self,
        watch_store: W2,
    ) -> EpisodeProcessorBuilder<S, G, Y, W2, M, C> {
        EpisodeProcessorBuilder {
            config: self.config,
            store: self.store,
            generator: self.generator,
            strategy: self.strategy,
            watch_store,
            notifier: self.notifier,
            clock: self.clock,
        }
    }

    /// Status messages and publish hand-off; `None` runs without a channel
    pub fn notifier<M2: MessagingChannel + Send + Sync>(
        self,
        notifier: Option<Notifier<M2>>,
    ) -> EpisodeProcessorBuilder<S, G, Y, W, M2, C> {
        EpisodeProcessorBuilder {
            config: self.config,
            store: self.store,
            generator: self.generator,
            strategy: self.strategy,
            watch_store: self.watch_store,
            notifier,
            clock: self.clock,
        }
    }

    pub fn clock<C2: Clock + Send + Sync>(
        self,
        clock: C2,
    ) -> EpisodeProcessorBuilder<S, G, Y, W, M, C2> {
        EpisodeProcessorBuilder {
            config: self.config,
            store: self.store,
            generator: self.generator,
            strategy: self.strategy,
            watch_store: self.watch_store,
            notifier: self.notifier,
            clock,
        }
    }
}

impl<S, G, Y, W, M, C> EpisodeProcessorBuilder<S, G, Y, W, M, C>
where
    S: ArtifactStore + Send + Sync,
    G: Generator + Send + Sync,
    Y: SelectionStrategy + Send + Sync,
    W: WatchStateStore + Send + Sync,
    M: MessagingChannel + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn build(self) -> EpisodeProcessor<S, G, Y, W, M, C> {
        EpisodeProcessor {
            config: self.config,
            store: self.store,
            generator: self.generator,
            strategy: self.strategy,
            watch_store: self.watch_store,
            notifier: self.notifier,
            clock: self.clock,
        }
    }
}
