//! The polish cycle controller.
//!
//! One [`Session`] per page. It owns all single-slot state (the selection
//! snapshot, the pending result, the overlay and the outstanding
//! confirmation) and serialises requests: while one rewrite is in flight the
//! trigger is busy and a second [`Session::begin`] is rejected.
//!
//! ```text
//! begin ──► [rewrite service] ──► complete ──► overlay
//!                                               ├─ apply ─► Applied
//!                                               │         └► AwaitingConfirmation ─ resolve ─► Applied | Cancelled
//!                                               ├─ copy
//!                                               └─ dismiss ─► selection restored
//! ```

use crate::applier::{self, ApplyStep, Decision, FallbackDialog, PendingConfirmation};
use crate::capture::capture;
use crate::context::SelectionContext;
use crate::error::PolishError;
use crate::guards::{
    ToolControls, is_control_element, is_meaningful_content, range_touches_controls,
};
use crate::presenter::{OVERLAY_MARGIN, Overlay, Presenter};
use crate::rewrite::{RewriteRequest, RewriteService, ServiceError, strip_reasoning};
use crate::snapshot::{Restore, SnapshotStore};
use crate::surface::Surface;

/// Default instruction sent along with every selection
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional English editor.
Polish the provided text for clarity, grammar, and tone while preserving the original meaning.
Return only the improved text without explanations, labels, or markdown formatting.";

/// Visual state of the trigger control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    Busy,
}

/// Latest rewrite and the selection it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct PendingResult {
    pub text: String,
    pub context: SelectionContext,
}

/// Where the apply state machine stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ApplyState {
    #[default]
    Idle,
    AwaitingConfirmation(PendingConfirmation),
    Applied,
    Cancelled,
}

/// Outcome of [`Session::apply`] and [`Session::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied,
    AwaitingConfirmation { prompt: String },
    Cancelled,
    Fallback(FallbackDialog),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub system_prompt: String,
    /// Label of the dialog shown when there is nothing to write into
    pub result_label: String,
    pub overlay_margin: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            result_label: "Polished result:".to_string(),
            overlay_margin: OVERLAY_MARGIN,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    options: SessionOptions,
    snapshot: SnapshotStore,
    presenter: Presenter,
    in_flight: Option<SelectionContext>,
    pending: Option<PendingResult>,
    apply_state: ApplyState,
    trigger: TriggerState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        let presenter = Presenter::new(options.overlay_margin);
        Self {
            options,
            snapshot: SnapshotStore::new(),
            presenter,
            in_flight: None,
            pending: None,
            apply_state: ApplyState::Idle,
            trigger: TriggerState::Idle,
        }
    }

    pub fn trigger(&self) -> TriggerState {
        self.trigger
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.presenter.overlay()
    }

    pub fn pending(&self) -> Option<&PendingResult> {
        self.pending.as_ref()
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn apply_state(&self) -> &ApplyState {
        &self.apply_state
    }

    /// Capture the selection and prepare a rewrite request for it
    pub fn begin<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        controls: &ToolControls,
    ) -> Result<RewriteRequest, PolishError> {
        let context = capture(&*surface);
        self.begin_with(surface, controls, context)
    }

    /// Like [`begin`](Self::begin), for a selection the caller already has
    pub fn begin_with<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        controls: &ToolControls,
        context: Option<SelectionContext>,
    ) -> Result<RewriteRequest, PolishError> {
        if self.trigger == TriggerState::Busy {
            log::debug!("rewrite requested while another is in flight");
            return Err(PolishError::Busy);
        }
        self.presenter.hide(surface, &mut self.snapshot, false);

        if let Some(context) = &context
            && refers_to_controls(&*surface, context, controls)
        {
            return Err(PolishError::SelfReferentialSelection);
        }
        let Some(context) = context.filter(|context| is_meaningful_content(context.text())) else {
            return Err(PolishError::NoSelection);
        };

        log::info!(
            "polishing {} chars from {:?}",
            context.text().chars().count(),
            context.origin()
        );
        self.snapshot.save(&*surface, Some(&context));
        self.pending = None;
        self.apply_state = ApplyState::Idle;
        let request = RewriteRequest {
            system_prompt: self.options.system_prompt.clone(),
            text: context.text().trim().to_string(),
        };
        self.in_flight = Some(context);
        self.trigger = TriggerState::Busy;
        Ok(request)
    }

    /// Take the service's answer for the request started by [`begin`](Self::begin)
    pub fn complete<S: Surface + ?Sized>(
        &mut self,
        surface: &S,
        outcome: Result<String, ServiceError>,
    ) -> Result<&Overlay, PolishError> {
        self.trigger = TriggerState::Idle;
        let Some(context) = self.in_flight.take() else {
            return Err(PolishError::NotInFlight);
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(ServiceError::Parse { reason }) => {
                log::error!("could not parse rewrite response: {reason}");
                return Err(PolishError::ParseFailure { reason });
            }
            Err(error) => {
                log::warn!("rewrite request failed: {error}");
                return Err(error.into());
            }
        };

        let text = strip_reasoning(&reply);
        if text.is_empty() {
            log::warn!("rewrite response was empty after cleanup");
            return Err(PolishError::EmptyResult);
        }

        let anchor = context.anchor();
        let pending = self.pending.insert(PendingResult { text, context });
        Ok(self
            .presenter
            .show(surface, &pending.text, anchor, Some(&pending.context)))
    }

    /// Capture, call `service` and show the result in one go
    pub fn run<S: Surface + ?Sized, R: RewriteService + ?Sized>(
        &mut self,
        surface: &mut S,
        controls: &ToolControls,
        service: &R,
    ) -> Result<&Overlay, PolishError> {
        let request = self.begin(surface, controls)?;
        let outcome = service.rewrite(&request);
        self.complete(&*surface, outcome)
    }

    /// Write the pending result back into the page
    pub fn apply<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<ApplyOutcome, PolishError> {
        let Some(pending) = self.pending.as_ref() else {
            return Err(PolishError::NothingPending);
        };
        let context = Some(&pending.context).filter(|_| self.overlay_allows_apply());
        let step = applier::apply(
            surface,
            context,
            &pending.text,
            &self.options.result_label,
        );
        self.presenter.hide(surface, &mut self.snapshot, false);
        self.settle(step)
    }

    /// Answer an outstanding confirmation
    pub fn resolve<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        decision: Decision,
    ) -> Result<ApplyOutcome, PolishError> {
        let confirmation = match std::mem::take(&mut self.apply_state) {
            ApplyState::AwaitingConfirmation(confirmation) => confirmation,
            other => {
                self.apply_state = other;
                return Err(PolishError::NothingPending);
            }
        };
        let step = confirmation.resolve(surface, decision);
        self.settle(step)
    }

    /// Close the overlay without applying and give the selection back
    pub fn dismiss<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Restore {
        self.presenter
            .hide(surface, &mut self.snapshot, true)
            .unwrap_or(Restore::Empty)
    }

    /// Put the pending result on the clipboard
    pub fn copy<S: Surface + ?Sized>(&self, surface: &mut S) -> Result<(), PolishError> {
        let pending = self.pending.as_ref().ok_or(PolishError::NothingPending)?;
        surface.write_clipboard(&pending.text).map_err(|e| {
            log::warn!("clipboard unavailable: {e}");
            PolishError::ClipboardUnavailable
        })
    }

    /// Whether the overlay offered apply. A view-only overlay falls back to the dialog.
    fn overlay_allows_apply(&self) -> bool {
        self.presenter
            .overlay()
            .is_none_or(|overlay| overlay.apply_enabled)
    }

    fn settle(&mut self, step: Result<ApplyStep, PolishError>) -> Result<ApplyOutcome, PolishError> {
        match step {
            Ok(ApplyStep::Applied) => {
                // The page changed under the saved selection
                self.snapshot.clear();
                self.pending = None;
                self.apply_state = ApplyState::Applied;
                Ok(ApplyOutcome::Applied)
            }
            Ok(ApplyStep::AwaitingConfirmation(confirmation)) => {
                let prompt = confirmation.prompt().to_string();
                self.apply_state = ApplyState::AwaitingConfirmation(confirmation);
                Ok(ApplyOutcome::AwaitingConfirmation { prompt })
            }
            Ok(ApplyStep::Cancelled) => {
                self.apply_state = ApplyState::Cancelled;
                Ok(ApplyOutcome::Cancelled)
            }
            Ok(ApplyStep::Fallback(dialog)) => {
                self.apply_state = ApplyState::Idle;
                Ok(ApplyOutcome::Fallback(dialog))
            }
            Err(PolishError::StaleTarget) => {
                log::info!("replacement target disappeared, dropping snapshot");
                self.snapshot.clear();
                self.apply_state = ApplyState::Idle;
                Err(PolishError::StaleTarget)
            }
            Err(error) => {
                self.apply_state = ApplyState::Idle;
                Err(error)
            }
        }
    }
}

/// Whether the captured selection reaches into the polisher's own UI
fn refers_to_controls<S: Surface + ?Sized>(
    surface: &S,
    context: &SelectionContext,
    controls: &ToolControls,
) -> bool {
    match context {
        SelectionContext::Editable(selection) => {
            is_control_element(surface, Some(selection.element), controls)
        }
        SelectionContext::Range(selection) => {
            range_touches_controls(surface, &selection.range, controls)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use crate::surface::{Boundary, NodeId, Size, TextRange};
    use pretty_assertions::assert_eq;

    struct Fixture {
        page: Page,
        controls: ToolControls,
        area: NodeId,
    }

    fn fixture(value: &str) -> Fixture {
        let mut page = Page::new(Size::new(1280.0, 800.0));
        let trigger = page.append_element(page.body(), "button");
        let area = page.append_textarea(page.body(), value);
        Fixture {
            page,
            controls: ToolControls::new(trigger),
            area,
        }
    }

    fn select_field(fixture: &mut Fixture, start: usize, end: usize) {
        fixture.page.focus(fixture.area, true);
        fixture
            .page
            .set_selection_offsets(fixture.area, start, end)
            .unwrap();
    }

    #[test]
    fn test_begin_without_selection() {
        let mut fixture = fixture("text");
        let mut session = Session::default();

        assert_eq!(
            session.begin(&mut fixture.page, &fixture.controls),
            Err(PolishError::NoSelection)
        );
        assert_eq!(session.trigger(), TriggerState::Idle);
        assert!(session.snapshot().is_empty());
    }

    #[test]
    fn test_begin_rejects_placeholder_selection() {
        let mut fixture = fixture("value: N/A");
        select_field(&mut fixture, 7, 10);
        let mut session = Session::default();

        assert_eq!(
            session.begin(&mut fixture.page, &fixture.controls),
            Err(PolishError::NoSelection)
        );
    }

    #[test]
    fn test_begin_builds_trimmed_request() {
        let mut fixture = fixture("  padded text  ");
        select_field(&mut fixture, 0, 15);
        let mut session = Session::default();

        let request = session.begin(&mut fixture.page, &fixture.controls).unwrap();

        assert_eq!(request.text, "padded text");
        assert_eq!(request.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(session.trigger(), TriggerState::Busy);
        assert!(!session.snapshot().is_empty());
    }

    #[test]
    fn test_second_begin_while_busy_is_rejected() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();

        assert_eq!(
            session.begin(&mut fixture.page, &fixture.controls),
            Err(PolishError::Busy)
        );
    }

    #[test]
    fn test_selection_inside_trigger_is_rejected() {
        let mut fixture = fixture("");
        let label = fixture.page.append_text(fixture.controls.trigger, "Polish");
        fixture
            .page
            .select(TextRange::new(Boundary::new(label, 0), Boundary::new(label, 6)))
            .unwrap();
        let mut session = Session::default();

        assert_eq!(
            session.begin(&mut fixture.page, &fixture.controls),
            Err(PolishError::SelfReferentialSelection)
        );
        assert_eq!(session.trigger(), TriggerState::Idle);
    }

    #[test]
    fn test_selection_ending_inside_overlay_is_rejected() {
        let mut fixture = fixture("");
        let text = fixture.page.append_text(fixture.page.body(), "page words");
        let overlay = fixture.page.append_element(fixture.page.body(), "div");
        let overlay_text = fixture.page.append_text(overlay, "Polished result");
        let controls = fixture.controls.with_overlay(overlay);
        fixture
            .page
            .select(TextRange::new(
                Boundary::new(text, 5),
                Boundary::new(overlay_text, 8),
            ))
            .unwrap();
        let mut session = Session::default();

        assert_eq!(
            session.begin(&mut fixture.page, &controls),
            Err(PolishError::SelfReferentialSelection)
        );
        assert!(session.snapshot().is_empty());
        assert_eq!(session.trigger(), TriggerState::Idle);
    }

    #[test]
    fn test_selection_ending_inside_trigger_is_rejected() {
        let mut page = Page::new(Size::new(1280.0, 800.0));
        let text = page.append_text(page.body(), "page words");
        let trigger = page.append_element(page.body(), "button");
        let label = page.append_text(trigger, "Polish");
        page.select(TextRange::new(Boundary::new(text, 5), Boundary::new(label, 3)))
            .unwrap();
        let mut session = Session::default();

        assert_eq!(
            session.begin(&mut page, &ToolControls::new(trigger)),
            Err(PolishError::SelfReferentialSelection)
        );
    }

    #[test]
    fn test_transport_failure_returns_trigger_to_idle() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();

        let result = session.complete(
            &fixture.page,
            Err(ServiceError::Transport {
                reason: "connection refused".to_string(),
            }),
        );

        assert!(matches!(result, Err(PolishError::TransportFailure { .. })));
        assert_eq!(session.trigger(), TriggerState::Idle);
        assert!(session.overlay().is_none());
    }

    #[test]
    fn test_parse_failure_is_distinct() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();

        let result = session.complete(
            &fixture.page,
            Err(ServiceError::Parse {
                reason: "missing choices".to_string(),
            }),
        );

        assert_eq!(
            result.err(),
            Some(PolishError::ParseFailure {
                reason: "missing choices".to_string()
            })
        );
        assert_eq!(session.trigger(), TriggerState::Idle);
    }

    #[test]
    fn test_reasoning_only_reply_is_empty_result() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();

        let result = session.complete(&fixture.page, Ok("<think>hmm</think>\n".to_string()));

        assert_eq!(result.err(), Some(PolishError::EmptyResult));
        assert!(session.overlay().is_none());
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_complete_without_begin() {
        let fixture = fixture("");
        let mut session = Session::default();

        assert_eq!(
            session.complete(&fixture.page, Ok("text".to_string())).err(),
            Some(PolishError::NotInFlight)
        );
    }

    #[test]
    fn test_apply_clears_snapshot_and_pending() {
        let mut fixture = fixture("teh cat");
        select_field(&mut fixture, 0, 3);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();
        session
            .complete(&fixture.page, Ok("the".to_string()))
            .unwrap();

        assert_eq!(
            session.apply(&mut fixture.page).unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(fixture.page.value(fixture.area).unwrap(), "the cat");
        assert!(session.snapshot().is_empty());
        assert!(session.pending().is_none());
        assert!(session.overlay().is_none());
        assert_eq!(session.apply_state(), &ApplyState::Applied);
    }

    #[test]
    fn test_apply_without_result() {
        let mut fixture = fixture("");
        let mut session = Session::default();

        assert_eq!(
            session.apply(&mut fixture.page),
            Err(PolishError::NothingPending)
        );
        assert_eq!(
            session.resolve(&mut fixture.page, Decision::Confirm),
            Err(PolishError::NothingPending)
        );
    }

    #[test]
    fn test_apply_after_target_removed_is_stale() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();
        session
            .complete(&fixture.page, Ok("many".to_string()))
            .unwrap();
        fixture.page.detach(fixture.area);

        // Overlay was built while the field was live, so apply is still offered
        assert_eq!(
            session.apply(&mut fixture.page),
            Err(PolishError::StaleTarget)
        );
        assert!(session.snapshot().is_empty());
    }

    #[test]
    fn test_view_only_overlay_applies_through_dialog() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::new(SessionOptions {
            result_label: "Polished result (qwen2.5:1.5b):".to_string(),
            ..SessionOptions::default()
        });
        session.begin(&mut fixture.page, &fixture.controls).unwrap();
        fixture.page.detach(fixture.area);

        let overlay = session
            .complete(&fixture.page, Ok("many".to_string()))
            .unwrap();
        assert!(!overlay.apply_enabled);

        assert_eq!(
            session.apply(&mut fixture.page).unwrap(),
            ApplyOutcome::Fallback(FallbackDialog {
                label: "Polished result (qwen2.5:1.5b):".to_string(),
                text: "many".to_string(),
            })
        );
    }

    #[test]
    fn test_copy_result() {
        let mut fixture = fixture("some words");
        select_field(&mut fixture, 0, 4);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();
        session
            .complete(&fixture.page, Ok("many".to_string()))
            .unwrap();

        session.copy(&mut fixture.page).unwrap();
        assert_eq!(fixture.page.clipboard(), Some("many"));

        fixture.page.set_clipboard_available(false);
        assert_eq!(
            session.copy(&mut fixture.page),
            Err(PolishError::ClipboardUnavailable)
        );
        // Copying never consumes the result
        assert!(session.pending().is_some());
    }

    #[test]
    fn test_whole_field_request_needs_confirmation() {
        let mut fixture = fixture("Entire draft here");
        let mut session = Session::default();
        let context = SelectionContext::whole_field(fixture.area, "Entire draft here");
        session
            .begin_with(&mut fixture.page, &fixture.controls, Some(context))
            .unwrap();
        session
            .complete(&fixture.page, Ok("The entire draft.".to_string()))
            .unwrap();

        let outcome = session.apply(&mut fixture.page).unwrap();

        assert!(matches!(outcome, ApplyOutcome::AwaitingConfirmation { .. }));
        assert!(matches!(
            session.apply_state(),
            ApplyState::AwaitingConfirmation(_)
        ));
        assert_eq!(
            session.resolve(&mut fixture.page, Decision::Confirm).unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            fixture.page.value(fixture.area).unwrap(),
            "The entire draft."
        );
    }

    #[test]
    fn test_new_request_resets_previous_result() {
        let mut fixture = fixture("first second");
        select_field(&mut fixture, 0, 5);
        let mut session = Session::default();
        session.begin(&mut fixture.page, &fixture.controls).unwrap();
        session
            .complete(&fixture.page, Ok("1st".to_string()))
            .unwrap();

        select_field(&mut fixture, 6, 12);
        session.begin(&mut fixture.page, &fixture.controls).unwrap();

        assert!(session.pending().is_none());
        assert!(session.overlay().is_none());
    }
}
