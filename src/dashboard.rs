//! Dashboard session: the state behind the history page.
//!
//! A [`Dashboard`] owns the full measurement sequence, the active retention policy, the
//! selection and the derived [`RenderedView`]. Each method is one turn of the event loop:
//! it changes the inputs and re-runs [`render`] before returning, so the view never lags
//! behind the state it was built from.
//!
//! Reloads are versioned. [`Dashboard::begin_reload`] issues a [`RequestToken`] and only
//! the response carrying the latest token is applied. Delete confirmations are applied to
//! whatever sequence and policy are current when they arrive, and they invalidate every
//! reload issued before them.

use crate::data::pipeline::{render, RenderedView, ViewOptions};
use crate::data::RetentionPolicy;
use crate::error::{AppResult, DashError};
use crate::measurement::export::write_feed;
use crate::measurement::ingest::parse_feed;
use crate::measurement::MeasurementSequence;
use crate::selection::{DeleteRequest, SelectionSet};
use crate::store::MeasurementStore;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt;
use std::io::Write;
use tracing::{info, instrument, warn};

/// Source of "now" for the retention window.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// Version of an ingestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Raw sequence number.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Result of [`Dashboard::delete_selected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Selection was empty, no request was sent
    NothingSelected,
    /// Number of measurements removed from the local sequence
    Deleted(usize),
}

/// History page session over a [`MeasurementStore`].
pub struct Dashboard<S, Tz = Local>
where
    Tz: TimeZone,
{
    store: S,
    tz: Tz,
    clock: Box<dyn Clock>,
    options: ViewOptions,
    sequence: MeasurementSequence,
    policy: RetentionPolicy,
    selection: SelectionSet,
    view: RenderedView,
    latest_token: u64,
}

impl<S: MeasurementStore> Dashboard<S, Local> {
    /// Session in the local time zone, driven by the wall clock.
    pub fn new(store: S, options: ViewOptions) -> Self {
        Self::with_timezone(store, options, Local)
    }
}

impl<S, Tz> Dashboard<S, Tz>
where
    S: MeasurementStore,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    /// Session rendering dates in `tz`, driven by the wall clock.
    pub fn with_timezone(store: S, options: ViewOptions, tz: Tz) -> Self {
        let mut dashboard = Self {
            store,
            tz,
            clock: Box::new(SystemClock),
            options,
            sequence: MeasurementSequence::default(),
            policy: RetentionPolicy::default(),
            selection: SelectionSet::new(),
            view: RenderedView::default(),
            latest_token: 0,
        };
        dashboard.rerender();
        dashboard
    }

    /// Replace the clock used for the retention window.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self.rerender();
        self
    }

    /// Start with `policy` instead of the default.
    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.set_policy(policy);
        self
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The view derived from the current state.
    pub fn view(&self) -> &RenderedView {
        &self.view
    }

    /// The full, unfiltered sequence.
    pub fn sequence(&self) -> &MeasurementSequence {
        &self.sequence
    }

    /// Active retention policy.
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Currently selected measurement timestamps.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.tz)
    }

    fn rerender(&mut self) {
        let now = self.now();
        self.view = render(
            &self.sequence,
            self.policy,
            &self.selection,
            &now,
            &self.options,
        );
        // Rows that left the window cannot stay selected.
        self.selection = self.selection.restricted_to(&self.view.filtered);
    }

    /// Start an ingestion request. Any earlier token becomes stale.
    pub fn begin_reload(&mut self) -> RequestToken {
        self.latest_token += 1;
        RequestToken(self.latest_token)
    }

    /// Apply the feed fetched for `token`.
    ///
    /// Returns the number of accepted measurements. On any error, including a stale token,
    /// the sequence and the view are left as they were.
    pub fn complete_reload(
        &mut self,
        token: RequestToken,
        feed: AppResult<String>,
    ) -> AppResult<usize> {
        if token.0 != self.latest_token {
            warn!(
                issued = token.0,
                latest = self.latest_token,
                "Discarding stale feed response"
            );
            return Err(DashError::StaleResponse {
                issued: token.0,
                latest: self.latest_token,
            });
        }

        let sequence = parse_feed(&feed?)?;
        let count = sequence.len();
        self.sequence = sequence;
        self.rerender();
        info!(count, visible = self.view.filtered.len(), "Loaded measurements");
        Ok(count)
    }

    /// Fetch the feed from the store and apply it.
    #[instrument(skip(self))]
    pub async fn reload(&mut self) -> AppResult<usize> {
        let token = self.begin_reload();
        let feed = self.store.fetch_feed().await;
        self.complete_reload(token, feed)
    }

    /// Switch the retention window and re-render.
    pub fn set_policy(&mut self, policy: RetentionPolicy) {
        if self.policy != policy {
            info!(from = %self.policy, to = %policy, "Changing retention policy");
        }
        self.policy = policy;
        self.rerender();
    }

    /// Toggle the rendered row at `index`. Returns whether it is now selected, `None` if
    /// there is no such row.
    pub fn toggle_row(&mut self, index: usize) -> Option<bool> {
        let point = self.view.points.get(index)?.clone();
        let selected = self.selection.toggle_point(&point);
        self.rerender();
        Some(selected)
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        self.selection = SelectionSet::new();
        self.rerender();
    }

    /// Delete request for the current selection, `None` when nothing is selected.
    pub fn prepare_delete(&self) -> Option<DeleteRequest> {
        self.selection.delete_request()
    }

    /// Apply the store's answer to `request`.
    ///
    /// On success the timestamps are removed from the current sequence and selection and
    /// the view is re-rendered with the current policy. Reloads issued before the
    /// confirmation become stale. On failure nothing changes.
    pub fn confirm_delete(
        &mut self,
        request: &DeleteRequest,
        outcome: AppResult<()>,
    ) -> AppResult<usize> {
        if let Err(e) = outcome {
            warn!(error = %e, "Delete failed, keeping selection");
            return Err(e);
        }

        self.latest_token += 1;
        let removed = request.timestamp_set();
        let before = self.sequence.len();
        self.sequence = self.sequence.without(&removed);
        self.selection = self.selection.without(&removed);
        self.rerender();

        let deleted = before - self.sequence.len();
        info!(
            requested = removed.len(),
            deleted, "Removed deleted measurements"
        );
        Ok(deleted)
    }

    /// Send the current selection to the store and apply the answer.
    #[instrument(skip(self))]
    pub async fn delete_selected(&mut self) -> AppResult<DeleteOutcome> {
        let Some(request) = self.prepare_delete() else {
            return Ok(DeleteOutcome::NothingSelected);
        };
        let outcome = self.store.delete(&request).await;
        let deleted = self.confirm_delete(&request, outcome)?;
        Ok(DeleteOutcome::Deleted(deleted))
    }

    /// Replace the remote log with `feed`, then reload from the store.
    ///
    /// The feed is parsed locally first so a malformed file never reaches the device.
    #[instrument(skip(self, feed))]
    pub async fn upload(&mut self, feed: String) -> AppResult<usize> {
        let parsed = parse_feed(&feed)?;
        info!(count = parsed.len(), "Uploading measurement feed");
        self.store.upload_feed(feed).await?;
        self.reload().await
    }

    /// Write the full sequence in feed format.
    pub fn export<W: Write>(&self, sink: W) -> AppResult<()> {
        write_feed(&self.sequence, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceConfig, SystemInfo};
    use async_trait::async_trait;

    struct NullStore;

    #[async_trait]
    impl MeasurementStore for NullStore {
        async fn fetch_feed(&self) -> AppResult<String> {
            Ok(String::new())
        }
        async fn delete(&self, _request: &DeleteRequest) -> AppResult<()> {
            Ok(())
        }
        async fn upload_feed(&self, _feed: String) -> AppResult<()> {
            Ok(())
        }
        async fn fetch_system_info(&self) -> AppResult<SystemInfo> {
            Ok(SystemInfo::default())
        }
        async fn fetch_device_config(&self) -> AppResult<DeviceConfig> {
            Ok(DeviceConfig::default())
        }
        async fn update_device_config(&self, _config: &DeviceConfig) -> AppResult<()> {
            Ok(())
        }
    }

    fn dashboard() -> Dashboard<NullStore, Utc> {
        Dashboard::with_timezone(NullStore, ViewOptions::default(), Utc)
            .with_clock(|| Utc.timestamp_opt(10_000, 0).unwrap())
    }

    #[test]
    fn tokens_increase() {
        let mut dash = dashboard();
        let first = dash.begin_reload();
        let second = dash.begin_reload();
        assert!(second > first);
    }

    #[test]
    fn stale_token_leaves_state_unchanged() {
        let mut dash = dashboard();
        let old = dash.begin_reload();
        let new = dash.begin_reload();

        let err = dash
            .complete_reload(old, Ok("time,weight\n1000,50\n".into()))
            .unwrap_err();
        assert!(matches!(err, DashError::StaleResponse { issued: 1, latest: 2 }));
        assert!(dash.sequence().is_empty());

        assert_eq!(
            dash.complete_reload(new, Ok("time,weight\n1000,50\n".into()))
                .unwrap(),
            1
        );
    }

    #[test]
    fn failed_fetch_keeps_previous_view() {
        let mut dash = dashboard();
        let token = dash.begin_reload();
        dash.complete_reload(token, Ok("time,weight\n1000,50\n2000,51\n".into()))
            .unwrap();

        let token = dash.begin_reload();
        let err = dash
            .complete_reload(token, Err(DashError::Stream("offline".into())))
            .unwrap_err();
        assert!(matches!(err, DashError::Stream(_)));
        assert_eq!(dash.view().points.len(), 2);
    }

    #[test]
    fn toggle_out_of_range_is_none() {
        let mut dash = dashboard();
        assert_eq!(dash.toggle_row(0), None);
    }
}
