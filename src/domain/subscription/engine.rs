//! The reconciliation engine.
//!
//! Every verified billing event funnels through [`ReconciliationEngine::apply`],
//! which folds the event into the subscription store and then runs the
//! membership side effects the resulting state change calls for. The engine
//! is deliberately one-way: billing truth is persisted first, and grants,
//! revocations and messages are best-effort afterthoughts whose failures are
//! reported but never propagated. Only a persistence failure makes `apply`
//! return an error, because an unrecorded transition is the one thing the
//! provider must redeliver.

use std::sync::Arc;

use thiserror::Error;

use crate::ports::{
    AccessController, BillingClient, Mutation, NotificationContext, NotificationKind, Notifier,
    RecordMutator, StoreError, SubscriptionStore,
};

use super::billing_event::{BillingEvent, BillingEventKind, SubscriberMetadata};
use super::plan::Plan;
use super::record::{SubscriberId, SubscriptionId, SubscriptionRecord};
use super::status::SubscriptionStatus;

/// The only failure `apply` surfaces. Everything downstream of persistence
/// is folded into the [`EffectReport`] instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// What happened to the stored record as a result of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// First sight of this subscription id; a record was created.
    Created,
    /// The record moved to a different status.
    Transitioned {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },
    /// The event was accepted but the status did not change.
    Refreshed,
    /// The event was newer than the marker but the record is terminal, so
    /// its status was held. The marker still advanced.
    Pinned,
    /// Duplicate or out-of-order delivery; the record was left untouched.
    Stale,
    /// The event could not be applied to any record.
    Skipped(SkipReason),
    /// Event type the engine does not model.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event references no subscription or checkout session.
    NoSubscriptionRef,
    /// No record exists and neither the event nor the billing provider
    /// could tell us which subscriber this belongs to.
    NoSubscriberIdentity,
}

/// Record of one attempted side effect. Failures live here, not in the
/// `apply` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Granted { invite_link: String, single_use: bool },
    GrantFailed(String),
    Revoked,
    RevokeFailed(String),
    Notified(NotificationKind),
    NotifyFailed(NotificationKind, String),
    /// An older subscription of the same subscriber was retired in favor of
    /// the one this event is about.
    Superseded { subscription_id: SubscriptionId },
}

/// Full account of what one event did: always returned on success so the
/// webhook handler can log it, and so tests can assert exact behavior.
#[derive(Debug)]
pub struct EffectReport {
    pub event_id: String,
    pub kind: BillingEventKind,
    pub disposition: Disposition,
    pub effects: Vec<Effect>,
}

impl EffectReport {
    fn new(event: &BillingEvent, disposition: Disposition) -> Self {
        Self {
            event_id: event.id.clone(),
            kind: event.kind(),
            disposition,
            effects: Vec::new(),
        }
    }
}

/// Target state and identity resolved for one event, after consulting the
/// billing provider (or falling back to what the event implies).
struct ResolvedTarget {
    status: SubscriptionStatus,
    period_end: Option<i64>,
    metadata: SubscriberMetadata,
}

pub struct ReconciliationEngine {
    store: Arc<dyn SubscriptionStore>,
    billing: Arc<dyn BillingClient>,
    access: Arc<dyn AccessController>,
    notifier: Arc<dyn Notifier>,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        billing: Arc<dyn BillingClient>,
        access: Arc<dyn AccessController>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            billing,
            access,
            notifier,
        }
    }

    /// Fold one verified event into the store and run its side effects.
    pub async fn apply(&self, event: BillingEvent) -> Result<EffectReport, EngineError> {
        let report = match event.kind() {
            BillingEventKind::PurchaseCompleted => self.handle_purchase(&event).await?,
            BillingEventKind::ChargeSucceeded => self.handle_charge_succeeded(&event).await?,
            BillingEventKind::ChargeFailed => self.handle_charge_failed(&event).await?,
            BillingEventKind::SubscriptionEnded => self.handle_ended(&event).await?,
            BillingEventKind::Unknown => {
                tracing::debug!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "ignoring unmodeled event type"
                );
                EffectReport::new(&event, Disposition::Ignored)
            }
        };

        tracing::info!(
            event_id = %report.event_id,
            event_type = %event.event_type,
            disposition = ?report.disposition,
            effects = report.effects.len(),
            "event reconciled"
        );
        Ok(report)
    }

    async fn handle_purchase(&self, event: &BillingEvent) -> Result<EffectReport, EngineError> {
        // A completed checkout may or may not already carry a subscription
        // id; when it does not we key the record by the session id and let a
        // later invoice event take over.
        let id = match event.subscription_id().or_else(|| event.object_id()) {
            Some(id) => SubscriptionId::new(id),
            None => {
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriptionRef),
                ))
            }
        };

        let mut resolved = self
            .resolve_target(event, &id, SubscriptionStatus::Active)
            .await;

        let subscriber = match resolved.metadata.subscriber_id.clone() {
            Some(subscriber) => subscriber,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = %id,
                    "purchase event without subscriber identity, skipping"
                );
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriberIdentity),
                ));
            }
        };

        let mut report = EffectReport::new(event, Disposition::Ignored);

        // A subscriber holds at most one live subscription. When two
        // subscriptions collide the newer event wins: an earlier one still
        // open under a different id is retired quietly (the subscriber asked
        // for the replacement, so no revoke or message), while a purchase
        // delivered late, after a newer subscription was already recorded,
        // has its record created already retired.
        if let Some(existing) = self.store.find_by_subscriber(&subscriber).await? {
            if existing.subscription_id != id && !existing.status.is_terminal() {
                if event.created > existing.last_event_at {
                    let retired_id = existing.subscription_id.clone();
                    let event_id = event.id.clone();
                    let occurred_at = event.created;
                    let fallback = existing.clone();
                    self.store
                        .upsert(
                            &retired_id,
                            Box::new(move |rec| {
                                rec.unwrap_or(fallback).superseded_by(&event_id, occurred_at)
                            }),
                        )
                        .await?;
                    tracing::info!(
                        subscriber_id = %subscriber,
                        retired = %retired_id,
                        replacement = %id,
                        "superseded older subscription"
                    );
                    report.effects.push(Effect::Superseded {
                        subscription_id: retired_id,
                    });
                } else {
                    tracing::info!(
                        subscriber_id = %subscriber,
                        subscription_id = %id,
                        kept = %existing.subscription_id,
                        "late purchase recorded as already retired"
                    );
                    resolved.status = SubscriptionStatus::Canceled;
                }
            }
        }

        let mutation = self
            .upsert_observation(event, &id, &subscriber, &resolved)
            .await?;
        report.disposition = classify(event, &mutation, resolved.status);

        // Grant exactly once per activation: skip when this delivery is
        // stale or the record was already active before the event.
        let was_active = mutation
            .previous
            .as_ref()
            .map(|p| p.status == SubscriptionStatus::Active)
            .unwrap_or(false);
        let accepted = !matches!(report.disposition, Disposition::Stale);

        if accepted && !was_active && mutation.current.status == SubscriptionStatus::Active {
            self.grant_and_confirm(&subscriber, &mutation.current, &mut report)
                .await;
        }
        self.revoke_on_membership_loss(&subscriber, &mutation, &mut report)
            .await;

        Ok(report)
    }

    async fn handle_charge_succeeded(
        &self,
        event: &BillingEvent,
    ) -> Result<EffectReport, EngineError> {
        let id = match event.subscription_id() {
            Some(id) => SubscriptionId::new(id),
            None => {
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriptionRef),
                ))
            }
        };

        let resolved = self
            .resolve_target(event, &id, SubscriptionStatus::Active)
            .await;

        let subscriber = match self.subscriber_for(&id, &resolved).await? {
            Some(subscriber) => subscriber,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = %id,
                    "charge event for unknown subscription without identity, skipping"
                );
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriberIdentity),
                ));
            }
        };

        let mutation = self
            .upsert_observation(event, &id, &subscriber, &resolved)
            .await?;
        let mut report = EffectReport::new(event, classify(event, &mutation, resolved.status));

        // Renewal message goes out once per accepted charge, and only while
        // the subscription actually stands active afterwards.
        let accepted = !matches!(report.disposition, Disposition::Stale);
        if accepted && mutation.current.status == SubscriptionStatus::Active {
            let context = NotificationContext {
                plan: Some(mutation.current.plan),
                invite_link: None,
                period_end: mutation.current.current_period_end,
            };
            self.send(&subscriber, NotificationKind::Renewed, &context, &mut report)
                .await;
        }
        self.revoke_on_membership_loss(&subscriber, &mutation, &mut report)
            .await;

        Ok(report)
    }

    async fn handle_charge_failed(
        &self,
        event: &BillingEvent,
    ) -> Result<EffectReport, EngineError> {
        let id = match event.subscription_id() {
            Some(id) => SubscriptionId::new(id),
            None => {
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriptionRef),
                ))
            }
        };

        // A failed charge marks the record past-due no matter what the
        // provider reports at this instant; the dunning outcome arrives as
        // its own event. The lookup still contributes identity and period end.
        let mut resolved = self
            .resolve_target(event, &id, SubscriptionStatus::PastDue)
            .await;
        resolved.status = SubscriptionStatus::PastDue;

        let subscriber = match self.subscriber_for(&id, &resolved).await? {
            Some(subscriber) => subscriber,
            None => {
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriberIdentity),
                ))
            }
        };

        // Failed charges mark the record past-due and nothing else. Access
        // stays until the provider gives up and ends the subscription.
        let mutation = self
            .upsert_observation(event, &id, &subscriber, &resolved)
            .await?;
        Ok(EffectReport::new(
            event,
            classify(event, &mutation, resolved.status),
        ))
    }

    async fn handle_ended(&self, event: &BillingEvent) -> Result<EffectReport, EngineError> {
        let id = match event.subscription_id() {
            Some(id) => SubscriptionId::new(id),
            None => {
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriptionRef),
                ))
            }
        };

        // The payload is the subscription object itself; no provider
        // round-trip needed, the end state is definitive.
        let resolved = ResolvedTarget {
            status: SubscriptionStatus::Canceled,
            period_end: event.period_end(),
            metadata: event.metadata(),
        };

        let subscriber = match self.subscriber_for(&id, &resolved).await? {
            Some(subscriber) => subscriber,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = %id,
                    "end event for unknown subscription without identity, skipping"
                );
                return Ok(EffectReport::new(
                    event,
                    Disposition::Skipped(SkipReason::NoSubscriberIdentity),
                ));
            }
        };

        let mutation = self
            .upsert_observation(event, &id, &subscriber, &resolved)
            .await?;
        let mut report = EffectReport::new(event, classify(event, &mutation, resolved.status));
        self.revoke_on_membership_loss(&subscriber, &mutation, &mut report)
            .await;

        Ok(report)
    }

    /// Kick the subscriber and say so, once, when an accepted event closed a
    /// membership-holding subscription. Any handler can observe that
    /// transition, not just the end event: a billing lookup on a charge may
    /// already report `canceled` before the end event is delivered, and the
    /// end event arriving afterwards lands stale. An ended `pending` record
    /// has nothing to remove, and a stale redelivery must not kick twice.
    async fn revoke_on_membership_loss(
        &self,
        subscriber: &SubscriberId,
        mutation: &Mutation,
        report: &mut EffectReport,
    ) {
        if matches!(report.disposition, Disposition::Stale) {
            return;
        }
        let held_membership = mutation
            .previous
            .as_ref()
            .map(|p| p.status.holds_membership())
            .unwrap_or(false);
        if !held_membership || mutation.current.status != SubscriptionStatus::Canceled {
            return;
        }

        match self.access.revoke(subscriber).await {
            Ok(()) => report.effects.push(Effect::Revoked),
            Err(err) => {
                tracing::error!(
                    subscriber_id = %subscriber,
                    error = %err,
                    "failed to revoke group access"
                );
                report.effects.push(Effect::RevokeFailed(err.to_string()));
            }
        }

        let context = NotificationContext {
            plan: Some(mutation.current.plan),
            invite_link: None,
            period_end: mutation.current.current_period_end,
        };
        self.send(subscriber, NotificationKind::AccessRemoved, &context, report)
            .await;
    }

    /// Ask the billing provider for the authoritative subscription state.
    /// On any failure, fall back to what the event implies and log the gap;
    /// a flaky provider API must not turn a valid webhook into an error.
    async fn resolve_target(
        &self,
        event: &BillingEvent,
        id: &SubscriptionId,
        implied: SubscriptionStatus,
    ) -> ResolvedTarget {
        let mut metadata = event.metadata();

        if event.subscription_id().is_some() {
            match self.billing.subscription(id.as_str()).await {
                Ok(sub) => {
                    if metadata.subscriber_id.is_none() {
                        metadata.subscriber_id = sub.subscriber_id;
                    }
                    if metadata.plan.is_none() {
                        metadata.plan = sub.plan;
                    }
                    return ResolvedTarget {
                        status: sub.status,
                        period_end: sub.current_period_end.or_else(|| event.period_end()),
                        metadata,
                    };
                }
                Err(err) => {
                    tracing::warn!(
                        subscription_id = %id,
                        error = %err,
                        "billing lookup failed, falling back to event-implied status"
                    );
                }
            }
        }

        ResolvedTarget {
            status: implied,
            period_end: event.period_end(),
            metadata,
        }
    }

    /// Identity for the record: the stored record wins, then resolved
    /// metadata. `None` means the event cannot create a record.
    async fn subscriber_for(
        &self,
        id: &SubscriptionId,
        resolved: &ResolvedTarget,
    ) -> Result<Option<SubscriberId>, EngineError> {
        if let Some(existing) = self.store.get(id).await? {
            return Ok(Some(existing.subscriber_id));
        }
        Ok(resolved.metadata.subscriber_id.clone())
    }

    async fn upsert_observation(
        &self,
        event: &BillingEvent,
        id: &SubscriptionId,
        subscriber: &SubscriberId,
        resolved: &ResolvedTarget,
    ) -> Result<Mutation, EngineError> {
        let target = resolved.status;
        let period_end = resolved.period_end;
        let event_id = event.id.clone();
        let occurred_at = event.created;
        let create_id = id.clone();
        let create_subscriber = subscriber.clone();
        let create_plan = resolved.metadata.plan.unwrap_or(Plan::Unknown);

        let mutate: RecordMutator = Box::new(move |existing| match existing {
            Some(record) => record.observe(target, period_end, &event_id, occurred_at),
            None => SubscriptionRecord::create(
                create_id,
                create_subscriber,
                create_plan,
                target,
                period_end,
                &event_id,
                occurred_at,
            ),
        });

        Ok(self.store.upsert(id, mutate).await?)
    }

    /// Issue the invite and tell the subscriber. Grant failure downgrades
    /// the message, never the stored state.
    async fn grant_and_confirm(
        &self,
        subscriber: &SubscriberId,
        record: &SubscriptionRecord,
        report: &mut EffectReport,
    ) {
        match self.access.grant(subscriber).await {
            Ok(token) => {
                let context = NotificationContext {
                    plan: Some(record.plan),
                    invite_link: Some(token.invite_link.clone()),
                    period_end: record.current_period_end,
                };
                report.effects.push(Effect::Granted {
                    invite_link: token.invite_link,
                    single_use: token.single_use,
                });
                self.send(subscriber, NotificationKind::Confirmed, &context, report)
                    .await;
            }
            Err(err) => {
                tracing::error!(
                    subscriber_id = %subscriber,
                    error = %err,
                    "failed to issue invite link"
                );
                report.effects.push(Effect::GrantFailed(err.to_string()));
                let context = NotificationContext {
                    plan: Some(record.plan),
                    invite_link: None,
                    period_end: record.current_period_end,
                };
                self.send(
                    subscriber,
                    NotificationKind::GrantUnavailable,
                    &context,
                    report,
                )
                .await;
            }
        }
    }

    async fn send(
        &self,
        subscriber: &SubscriberId,
        kind: NotificationKind,
        context: &NotificationContext,
        report: &mut EffectReport,
    ) {
        match self.notifier.notify(subscriber, kind, context).await {
            Ok(()) => report.effects.push(Effect::Notified(kind)),
            Err(err) => {
                tracing::warn!(
                    subscriber_id = %subscriber,
                    kind = kind.as_str(),
                    error = %err,
                    "notification delivery failed"
                );
                report
                    .effects
                    .push(Effect::NotifyFailed(kind, err.to_string()));
            }
        }
    }
}

/// Map a store mutation back to what it meant for this event. The mutator
/// stamps `last_event_id` only when it accepts the event, so that field is
/// the applied/stale discriminator.
fn classify(event: &BillingEvent, mutation: &Mutation, target: SubscriptionStatus) -> Disposition {
    let previous = match &mutation.previous {
        Some(previous) => previous,
        None => return Disposition::Created,
    };

    if mutation.current.last_event_id != event.id {
        return Disposition::Stale;
    }

    if previous.status != mutation.current.status {
        return Disposition::Transitioned {
            from: previous.status,
            to: mutation.current.status,
        };
    }

    if mutation.current.status.is_terminal() && target != mutation.current.status {
        return Disposition::Pinned;
    }

    Disposition::Refreshed
}
