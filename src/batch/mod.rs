use crate::{
    config::BatchConfig,
    error::{Result, StoryboardError},
    gemini::ImageGenerator,
    models::{today, Character, GenerationSettings, PromptItem, ResultSlot},
};
use chrono::{DateTime, TimeZone};
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Message stored on slots whose call was dropped before it finished.
pub const CANCELLED: &str = "Generation cancelled";

/// Runs batches of scene prompts against an image generator.
///
/// Every method takes `&self`, so a failed slot can be retried while its
/// siblings are still loading. Each dispatched call carries an attempt
/// number; a completion is applied only while its attempt is still the one
/// recorded for the slot, so a superseded call's result is dropped. A call
/// whose future is dropped marks its slot as cancelled, which leaves it
/// retryable. Observers get a fresh snapshot after every change through
/// `subscribe`. The orchestrator is cheap to clone; clones share state.
#[derive(Clone)]
pub struct BatchOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    generator: Arc<dyn ImageGenerator>,
    config: BatchConfig,
    state: Mutex<BatchState>,
    updates: watch::Sender<Vec<ResultSlot>>,
}

#[derive(Default)]
struct BatchState {
    slots: Vec<ResultSlot>,
    /// Attempt currently in flight for the slot at the same index.
    in_flight: Vec<Option<u64>>,
    next_attempt: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt {
    index: usize,
    number: u64,
}

impl BatchState {
    fn claim(&mut self, index: usize) -> Attempt {
        self.next_attempt += 1;
        self.in_flight[index] = Some(self.next_attempt);
        Attempt {
            index,
            number: self.next_attempt,
        }
    }

    fn is_current(&self, attempt: Attempt) -> bool {
        self.in_flight.get(attempt.index) == Some(&Some(attempt.number))
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &BatchState) {
        self.updates.send_replace(state.slots.clone());
    }

    /// Apply a finished call, unless a newer attempt owns the slot.
    fn complete(&self, attempt: Attempt, outcome: Result<String>) -> Option<ResultSlot> {
        let mut state = self.lock();
        if !state.is_current(attempt) {
            log::debug!("Dropping superseded result for slot {}", attempt.index);
            return None;
        }
        state.in_flight[attempt.index] = None;

        let slot = &mut state.slots[attempt.index];
        match outcome {
            Ok(image_data) => {
                log::info!("Generated {}", slot.file_name);
                slot.succeed(image_data);
            }
            Err(e) => {
                log::error!("Generation failed for {}: {}", slot.file_name, e);
                slot.fail(e.to_string());
            }
        }
        let slot = slot.clone();
        self.publish(&state);
        Some(slot)
    }

    fn cancel(&self, attempts: &[Attempt]) {
        let mut state = self.lock();
        let mut changed = false;
        for attempt in attempts {
            if !state.is_current(*attempt) {
                continue;
            }
            state.in_flight[attempt.index] = None;
            let slot = &mut state.slots[attempt.index];
            log::warn!("Generation of {} was cancelled", slot.file_name);
            slot.fail(CANCELLED);
            changed = true;
        }
        if changed {
            self.publish(&state);
        }
    }
}

/// Marks the attempts it holds as cancelled when dropped; attempts that
/// already completed are left alone.
struct InFlight {
    shared: Arc<Shared>,
    attempts: Vec<Attempt>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.shared.cancel(&self.attempts);
    }
}

/// A batch whose slots exist and are `loading`, ready to be driven.
///
/// `run` owns everything it needs, so it can be spawned and the session
/// stays free for edits and retries meanwhile. Dropping the run, or the
/// future returned by `run`, cancels the slots still in flight.
pub struct BatchRun {
    guard: InFlight,
    jobs: Vec<(Attempt, String)>,
    characters: Arc<[Character]>,
    settings: Arc<GenerationSettings>,
    limit: usize,
}

impl BatchRun {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Dispatch every scene and apply completions as they arrive.
    pub async fn run(self) -> Vec<ResultSlot> {
        let BatchRun {
            guard,
            jobs,
            characters,
            settings,
            limit,
        } = self;
        let shared = Arc::clone(&guard.shared);
        let generator = Arc::clone(&shared.generator);

        let mut completions = stream::iter(jobs)
            .map(|(attempt, prompt)| {
                let generator = Arc::clone(&generator);
                let characters = Arc::clone(&characters);
                let settings = Arc::clone(&settings);
                async move {
                    let outcome = generator.generate(&prompt, &characters, &settings).await;
                    (attempt, outcome)
                }
            })
            .buffer_unordered(limit);

        while let Some((attempt, outcome)) = completions.next().await {
            shared.complete(attempt, outcome);
        }
        drop(guard);

        let state = shared.lock();
        log::info!(
            "Batch finished: {}/{} scenes generated",
            state.slots.iter().filter(|s| s.is_success()).count(),
            state.slots.len()
        );
        state.slots.clone()
    }
}

impl BatchOrchestrator {
    pub fn new(generator: Arc<dyn ImageGenerator>, config: BatchConfig) -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                generator,
                config,
                state: Mutex::new(BatchState::default()),
                updates,
            }),
        }
    }

    /// Snapshot of the current slots, in prompt order.
    pub fn slots(&self) -> Vec<ResultSlot> {
        self.shared.lock().slots.clone()
    }

    pub fn get(&self, slot_id: &str) -> Option<ResultSlot> {
        self.shared
            .lock()
            .slots
            .iter()
            .find(|s| s.id == slot_id)
            .cloned()
    }

    pub fn completed_count(&self) -> usize {
        self.shared
            .lock()
            .slots
            .iter()
            .filter(|s| s.is_success())
            .count()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ResultSlot>> {
        self.shared.updates.subscribe()
    }

    /// Replace the current results with one `loading` slot per non-blank
    /// prompt and hand back the run that fills them.
    ///
    /// Fails only on pre-flight checks (no prompts, missing credentials), in
    /// which case the previous results are untouched. The characters and
    /// settings are captured here; later edits only affect retries.
    pub fn begin_batch(
        &self,
        prompts: &[PromptItem],
        characters: &[Character],
        settings: &GenerationSettings,
    ) -> Result<BatchRun> {
        let slots = prepare_slots(prompts, &today())?;
        self.shared.generator.ensure_configured()?;

        log::info!("Starting batch of {} scenes", slots.len());
        let mut state = self.shared.lock();
        state.in_flight = vec![None; slots.len()];
        state.slots = slots;
        let jobs: Vec<(Attempt, String)> = (0..state.slots.len())
            .map(|index| {
                let attempt = state.claim(index);
                (attempt, state.slots[index].prompt_text.clone())
            })
            .collect();
        self.shared.publish(&state);
        drop(state);

        let limit = self
            .shared
            .config
            .max_concurrency
            .unwrap_or(jobs.len())
            .max(1);
        Ok(BatchRun {
            guard: InFlight {
                shared: Arc::clone(&self.shared),
                attempts: jobs.iter().map(|(attempt, _)| *attempt).collect(),
            },
            jobs,
            characters: characters.to_vec().into(),
            settings: Arc::new(settings.clone()),
            limit,
        })
    }

    /// Generate one image per non-blank prompt, replacing any previous results.
    ///
    /// Per-scene failures end up on their own slot.
    pub async fn run_batch(
        &self,
        prompts: &[PromptItem],
        characters: &[Character],
        settings: &GenerationSettings,
    ) -> Result<Vec<ResultSlot>> {
        let run = self.begin_batch(prompts, characters, settings)?;
        Ok(run.run().await)
    }

    /// Regenerate a single slot with the characters and settings passed in now.
    ///
    /// Other slots may still be loading. A slot whose own call is in flight
    /// is refused with `SlotBusy`.
    pub async fn retry_one(
        &self,
        slot_id: &str,
        characters: &[Character],
        settings: &GenerationSettings,
    ) -> Result<ResultSlot> {
        self.shared.generator.ensure_configured()?;

        let (attempt, prompt) = {
            let mut state = self.shared.lock();
            let index = state
                .slots
                .iter()
                .position(|s| s.id == slot_id)
                .ok_or_else(|| StoryboardError::SlotNotFound(slot_id.to_string()))?;
            if state.in_flight[index].is_some() {
                return Err(StoryboardError::SlotBusy(slot_id.to_string()));
            }

            let attempt = state.claim(index);
            let slot = &mut state.slots[index];
            log::info!("Retrying {}", slot.file_name);
            slot.start_loading();
            let prompt = slot.prompt_text.clone();
            self.shared.publish(&state);
            (attempt, prompt)
        };
        let guard = InFlight {
            shared: Arc::clone(&self.shared),
            attempts: vec![attempt],
        };

        let outcome = self
            .shared
            .generator
            .generate(&prompt, characters, settings)
            .await;
        let applied = self.shared.complete(attempt, outcome);
        drop(guard);

        // A newer batch or retry took the slot over; report what is there now.
        applied
            .or_else(|| self.get(slot_id))
            .ok_or_else(|| StoryboardError::SlotNotFound(slot_id.to_string()))
    }
}

/// Build the `loading` slots for a batch created at `created_at`.
pub fn prepare_slots<Tz: TimeZone>(
    prompts: &[PromptItem],
    created_at: &DateTime<Tz>,
) -> Result<Vec<ResultSlot>> {
    let slots: Vec<ResultSlot> = prompts
        .iter()
        .filter(|p| !p.is_blank())
        .enumerate()
        .map(|(index, prompt)| ResultSlot::pending(prompt, index, created_at))
        .collect();

    if slots.is_empty() {
        return Err(StoryboardError::NoPrompts);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, CharacterRegistry, SlotStatus};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Generator double: answers from a script keyed by prompt text.
    #[derive(Default)]
    struct ScriptedGenerator {
        unconfigured: bool,
        failing: Mutex<HashSet<String>>,
        delays: HashMap<String, Duration>,
        calls: Mutex<Vec<(String, Option<String>)>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        observer: Mutex<Option<watch::Receiver<Vec<ResultSlot>>>>,
        observed: Mutex<Vec<Vec<SlotStatus>>>,
    }

    impl ScriptedGenerator {
        fn failing_on(prompts: &[&str]) -> Self {
            Self {
                failing: Mutex::new(prompts.iter().map(|p| p.to_string()).collect()),
                ..Default::default()
            }
        }

        fn with_delays(delays: &[(&str, u64)]) -> Self {
            Self {
                delays: delays
                    .iter()
                    .map(|(p, ms)| (p.to_string(), Duration::from_millis(*ms)))
                    .collect(),
                ..Default::default()
            }
        }

        fn recover(&self, prompt: &str) {
            self.failing.lock().unwrap().remove(prompt);
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        fn ensure_configured(&self) -> Result<()> {
            if self.unconfigured {
                return Err(StoryboardError::ConfigError("API key is missing".into()));
            }
            Ok(())
        }

        async fn generate(
            &self,
            prompt: &str,
            _characters: &[Character],
            settings: &GenerationSettings,
        ) -> Result<String> {
            self.calls.lock().unwrap().push((
                prompt.to_string(),
                settings.resolved_ratio().map(String::from),
            ));
            if let Some(observer) = self.observer.lock().unwrap().as_ref() {
                let statuses = observer.borrow().iter().map(|s| s.status).collect();
                self.observed.lock().unwrap().push(statuses);
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(prompt) {
                tokio::time::sleep(*delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().unwrap().contains(prompt) {
                return Err(StoryboardError::UpstreamError(format!(
                    "rejected: {}",
                    prompt
                )));
            }
            Ok(format!("data:image/png;base64,{}", prompt.len()))
        }
    }

    fn prompts(texts: &[&str]) -> Vec<PromptItem> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| PromptItem::new(format!("p-{}", i + 1), *text))
            .collect()
    }

    fn even_delays(texts: &[&'static str], ms: u64) -> Vec<(&'static str, u64)> {
        texts.iter().map(|p| (*p, ms)).collect()
    }

    fn orchestrator(generator: &Arc<ScriptedGenerator>) -> BatchOrchestrator {
        let generator: Arc<dyn ImageGenerator> = generator.clone();
        BatchOrchestrator::new(generator, BatchConfig::default())
    }

    fn statuses(batch: &BatchOrchestrator) -> Vec<SlotStatus> {
        batch.slots().iter().map(|s| s.status).collect()
    }

    #[test]
    fn test_prepare_slots_numbers_accepted_prompts() {
        let created_at = Utc.with_ymd_and_hms(2025, 11, 10, 9, 30, 0).unwrap();
        let slots = prepare_slots(&prompts(&["one", " ", "two", "three"]), &created_at).unwrap();

        let names: Vec<_> = slots.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["001_10Nov2025.png", "002_10Nov2025.png", "003_10Nov2025.png"]
        );
        let texts: Vec<_> = slots.iter().map(|s| s.prompt_text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(slots.iter().all(|s| s.status == SlotStatus::Loading));
        assert_eq!(slots[1].id, format!("p-3-{}", created_at.timestamp_millis()));
    }

    #[test]
    fn test_prepare_slots_without_text_is_rejected() {
        let created_at = Utc.with_ymd_and_hms(2025, 11, 10, 9, 30, 0).unwrap();
        assert_matches!(
            prepare_slots(&prompts(&["", "  \n"]), &created_at),
            Err(StoryboardError::NoPrompts)
        );
    }

    #[tokio::test]
    async fn test_batch_creates_one_slot_per_prompt() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        let registry = CharacterRegistry::new();

        let slots = batch
            .run_batch(
                &prompts(&["a", "", "b", "c"]),
                registry.all(),
                &GenerationSettings::default(),
            )
            .await
            .unwrap();

        assert_eq!(slots.len(), 3);
        let suffix = &slots[0].file_name[3..];
        for (i, slot) in slots.iter().enumerate() {
            assert!(slot.file_name.starts_with(&format!("{:03}_", i + 1)));
            assert_eq!(&slot.file_name[3..], suffix);
            assert_eq!(slot.status, SlotStatus::Success);
            assert!(slot.image_data.starts_with("data:image/png;base64,"));
        }
        assert_eq!(generator.call_count(), 3);
        assert_eq!(batch.completed_count(), 3);
    }

    #[tokio::test]
    async fn test_file_names_use_todays_date() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        let before = today().date_naive();

        batch
            .run_batch(&prompts(&["a"]), &[], &GenerationSettings::default())
            .await
            .unwrap();

        let after = today().date_naive();
        let name = batch.slots()[0].file_name.clone();
        let expected: Vec<String> = [before, after]
            .iter()
            .map(|d: &NaiveDate| crate::models::file_name_for(1, *d))
            .collect();
        assert!(expected.contains(&name));
    }

    #[tokio::test]
    async fn test_no_prompts_makes_no_calls_and_keeps_results() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        batch
            .run_batch(&prompts(&["first"]), &[], &GenerationSettings::default())
            .await
            .unwrap();

        let result = batch
            .run_batch(&prompts(&["  "]), &[], &GenerationSettings::default())
            .await;
        assert_matches!(result, Err(StoryboardError::NoPrompts));
        assert_eq!(generator.call_count(), 1);
        assert_eq!(batch.slots().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_block_the_batch() {
        let generator = Arc::new(ScriptedGenerator {
            unconfigured: true,
            ..Default::default()
        });
        let batch = orchestrator(&generator);

        let result = batch
            .run_batch(&prompts(&["scene"]), &[], &GenerationSettings::default())
            .await;
        let error = result.unwrap_err();
        assert!(error.is_preflight());
        assert_matches!(error, StoryboardError::ConfigError(_));
        assert!(batch.slots().is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_slot_does_not_affect_siblings() {
        let generator = Arc::new(ScriptedGenerator::failing_on(&["middle"]));
        let batch = orchestrator(&generator);

        let slots = batch
            .run_batch(
                &prompts(&["left", "middle", "right"]),
                &[],
                &GenerationSettings::default(),
            )
            .await
            .unwrap();

        assert_eq!(slots[0].status, SlotStatus::Success);
        assert_eq!(slots[1].status, SlotStatus::Error);
        assert_eq!(slots[2].status, SlotStatus::Success);
        assert!(slots[1].error.as_deref().unwrap().contains("rejected: middle"));
        assert!(slots[1].image_data.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_completion_keeps_slot_order() {
        let generator = Arc::new(ScriptedGenerator::with_delays(&[
            ("slow", 60),
            ("medium", 30),
            ("fast", 0),
        ]));
        let batch = orchestrator(&generator);
        let mut updates = batch.subscribe();

        batch
            .run_batch(
                &prompts(&["slow", "medium", "fast"]),
                &[],
                &GenerationSettings::default(),
            )
            .await
            .unwrap();

        let slots = batch.slots();
        let texts: Vec<_> = slots.iter().map(|s| s.prompt_text.as_str()).collect();
        assert_eq!(texts, vec!["slow", "medium", "fast"]);
        assert!(slots.iter().all(|s| s.is_success()));
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().len(), 3);
    }

    #[tokio::test]
    async fn test_unbounded_batch_dispatches_everything_at_once() {
        let texts = ["a", "b", "c", "d", "e"];
        let generator = Arc::new(ScriptedGenerator::with_delays(&even_delays(&texts, 20)));
        let batch = orchestrator(&generator);

        batch
            .run_batch(&prompts(&texts), &[], &GenerationSettings::default())
            .await
            .unwrap();

        assert_eq!(generator.peak_in_flight.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_concurrency_limit_bounds_in_flight_calls() {
        let texts = ["a", "b", "c", "d", "e"];
        let generator = Arc::new(ScriptedGenerator::with_delays(&even_delays(&texts, 20)));
        let dyn_generator: Arc<dyn ImageGenerator> = generator.clone();
        let batch =
            BatchOrchestrator::new(dyn_generator, BatchConfig::new().with_max_concurrency(2));

        let slots = batch
            .run_batch(&prompts(&texts), &[], &GenerationSettings::default())
            .await
            .unwrap();

        assert_eq!(slots.len(), 5);
        assert_eq!(generator.peak_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slots_are_loading_while_calls_run() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        *generator.observer.lock().unwrap() = Some(batch.subscribe());

        batch
            .run_batch(&prompts(&["one", "two"]), &[], &GenerationSettings::default())
            .await
            .unwrap();

        let observed = generator.observed.lock().unwrap();
        assert_eq!(observed.len(), 2);
        assert_eq!(observed[0], vec![SlotStatus::Loading, SlotStatus::Loading]);
    }

    #[tokio::test]
    async fn test_retry_keeps_identity_and_passes_through_loading() {
        let generator = Arc::new(ScriptedGenerator::failing_on(&["two"]));
        let batch = orchestrator(&generator);
        batch
            .run_batch(
                &prompts(&["one", "two", "three"]),
                &[],
                &GenerationSettings::default(),
            )
            .await
            .unwrap();
        let before = batch.slots()[1].clone();
        assert_eq!(before.status, SlotStatus::Error);

        generator.recover("two");
        *generator.observer.lock().unwrap() = Some(batch.subscribe());
        let retried = batch
            .retry_one(&before.id, &[], &GenerationSettings::default())
            .await
            .unwrap();

        assert_eq!(retried.id, before.id);
        assert_eq!(retried.file_name, before.file_name);
        assert_eq!(retried.status, SlotStatus::Success);
        assert!(retried.error.is_none());
        assert_eq!(batch.slots()[1].id, before.id);

        let observed = generator.observed.lock().unwrap();
        assert_eq!(
            observed.last().unwrap(),
            &vec![SlotStatus::Success, SlotStatus::Loading, SlotStatus::Success]
        );
    }

    #[tokio::test]
    async fn test_retry_uses_current_settings() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        batch
            .run_batch(
                &prompts(&["scene"]),
                &[],
                &GenerationSettings::new(AspectRatio::Ratio16x9),
            )
            .await
            .unwrap();
        let slot_id = batch.slots()[0].id.clone();

        batch
            .retry_one(&slot_id, &[], &GenerationSettings::new(AspectRatio::Ratio1x1))
            .await
            .unwrap();

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls[0].1.as_deref(), Some("16:9"));
        assert_eq!(calls[1].1.as_deref(), Some("1:1"));
    }

    #[tokio::test]
    async fn test_retry_unknown_slot() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        let result = batch
            .retry_one("p-1-0", &[], &GenerationSettings::default())
            .await;
        assert_matches!(result, Err(StoryboardError::SlotNotFound(_)));
    }

    #[tokio::test]
    async fn test_new_batch_replaces_previous_results() {
        let generator = Arc::new(ScriptedGenerator::default());
        let batch = orchestrator(&generator);
        batch
            .run_batch(&prompts(&["a", "b", "c"]), &[], &GenerationSettings::default())
            .await
            .unwrap();

        let slots = batch
            .run_batch(&prompts(&["d"]), &[], &GenerationSettings::default())
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].prompt_text, "d");
        assert!(slots[0].file_name.starts_with("001_"));
    }

    #[tokio::test]
    async fn test_dropped_batch_leaves_slots_retryable() {
        let generator = Arc::new(ScriptedGenerator::with_delays(&[("slow", 200)]));
        let batch = orchestrator(&generator);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            batch.run_batch(&prompts(&["slow"]), &[], &GenerationSettings::default()),
        )
        .await;
        assert!(timed_out.is_err());

        let slot = batch.slots()[0].clone();
        assert_eq!(slot.status, SlotStatus::Error);
        assert_eq!(slot.error.as_deref(), Some(CANCELLED));

        let retried = batch
            .retry_one(&slot.id, &[], &GenerationSettings::default())
            .await
            .unwrap();
        assert_eq!(retried.status, SlotStatus::Success);
        assert_eq!(retried.file_name, slot.file_name);
    }

    #[tokio::test]
    async fn test_dropped_retry_leaves_slot_retryable() {
        let generator = Arc::new(ScriptedGenerator::with_delays(&[("scene", 50)]));
        let batch = orchestrator(&generator);
        let settings = GenerationSettings::default();
        batch
            .run_batch(&prompts(&["scene"]), &[], &settings)
            .await
            .unwrap();
        let slot_id = batch.slots()[0].id.clone();

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            batch.retry_one(&slot_id, &[], &settings),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(batch.slots()[0].error.as_deref(), Some(CANCELLED));

        let retried = batch.retry_one(&slot_id, &[], &settings).await.unwrap();
        assert_eq!(retried.status, SlotStatus::Success);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retry_while_siblings_are_loading() {
        let generator = Arc::new(ScriptedGenerator {
            failing: Mutex::new(["broken".to_string()].into_iter().collect()),
            delays: [("slow".to_string(), Duration::from_millis(300))]
                .into_iter()
                .collect(),
            ..Default::default()
        });
        let batch = orchestrator(&generator);
        let mut updates = batch.subscribe();

        let run = batch
            .begin_batch(
                &prompts(&["broken", "slow"]),
                &[],
                &GenerationSettings::default(),
            )
            .unwrap();
        assert_eq!(run.len(), 2);
        let handle = tokio::spawn(run.run());

        updates
            .wait_for(|slots| slots.first().map(|s| s.status) == Some(SlotStatus::Error))
            .await
            .unwrap();
        let failed_id = batch.slots()[0].id.clone();

        generator.recover("broken");
        let retried = batch
            .retry_one(&failed_id, &[], &GenerationSettings::default())
            .await
            .unwrap();
        assert_eq!(retried.status, SlotStatus::Success);
        assert_eq!(statuses(&batch), vec![SlotStatus::Success, SlotStatus::Loading]);

        let slow_id = batch.slots()[1].id.clone();
        assert_matches!(
            batch
                .retry_one(&slow_id, &[], &GenerationSettings::default())
                .await,
            Err(StoryboardError::SlotBusy(_))
        );

        let slots = handle.await.unwrap();
        assert!(slots.iter().all(|s| s.is_success()));
    }

    #[tokio::test]
    async fn test_superseded_batch_results_are_ignored() {
        let generator = Arc::new(ScriptedGenerator::with_delays(&[("old", 100)]));
        let batch = orchestrator(&generator);

        let old = tokio::spawn(
            batch
                .begin_batch(&prompts(&["old"]), &[], &GenerationSettings::default())
                .unwrap()
                .run(),
        );
        batch
            .run_batch(&prompts(&["new"]), &[], &GenerationSettings::default())
            .await
            .unwrap();
        old.await.unwrap();

        let slots = batch.slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].prompt_text, "new");
        assert_eq!(slots[0].status, SlotStatus::Success);
    }
}
