// src/registry.rs
//! Period-bucketed subscriptions and event dispatch

use crate::error::{GpsError, Result};
use crate::position::PositionType;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Shortest refresh period handed to subscribers, in milliseconds.
pub const MIN_PERIOD_MS: u32 = 100;
/// Longest refresh period, in milliseconds.
pub const MAX_PERIOD_MS: u32 = 60_000;
/// Refresh period used when a subscriber names none.
pub const DEFAULT_PERIOD_MS: i64 = 2000;

/// Views a slow listener may fall behind before it starts lagging.
const CHANNEL_CAPACITY: usize = 16;

/// Clamp and quantize a requested period to one of the served steps.
///
/// Periods at or below 100 ms collapse to 100 ms, periods above one minute
/// to one minute. In between, the period counted in 100 ms units is
/// rounded down by masking it to the smallest all-ones mask that covers
/// it, so nearby requests share a bucket.
pub fn normalize_period(period_ms: i64) -> u32 {
    let deca: u32 = if period_ms <= i64::from(MIN_PERIOD_MS) {
        1
    } else if period_ms > i64::from(MAX_PERIOD_MS) {
        MAX_PERIOD_MS / 100
    } else {
        (period_ms / 100) as u32
    };
    let mut mask: u32 = 31;
    while deca > deca & mask {
        mask = (mask << 1) | 1;
    }
    100 * (deca & mask)
}

/// A live subscription handed back to the caller.
///
/// Dropping the receiver is enough to end delivery: the subscription is
/// reclaimed by the next dispatch pass that finds no listeners, or earlier
/// through an explicit unsubscribe.
#[derive(Debug)]
pub struct Subscription {
    pub id: i32,
    pub name: String,
    pub receiver: broadcast::Receiver<Arc<Value>>,
}

#[derive(Debug)]
struct Event {
    id: i32,
    name: String,
    ty: PositionType,
    channel: broadcast::Sender<Arc<Value>>,
}

#[derive(Debug)]
struct PeriodBucket {
    /// Normalized period in milliseconds.
    period: u32,
    /// When this bucket was last serviced; `None` means immediately due.
    last: Option<Instant>,
    events: Vec<Event>,
}

/// All subscriptions, grouped by normalized period in ascending order.
#[derive(Debug, Default)]
pub struct Registry {
    buckets: Vec<PeriodBucket>,
    /// Subscription id to the period of its owning bucket.
    ids: HashMap<i32, u32>,
    next_id: i32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Find or create the subscription for `(ty, period_ms)` and attach a
    /// new listener to it.
    ///
    /// A second subscriber asking for the same type and normalized period
    /// joins the existing subscription instead of creating a twin. Fails
    /// only when the id space is exhausted, and then leaves nothing
    /// behind.
    pub fn subscribe(&mut self, ty: PositionType, period_ms: i64) -> Result<Subscription> {
        let period = normalize_period(period_ms);
        let pos = self.buckets.binary_search_by_key(&period, |b| b.period);

        if let Ok(idx) = pos {
            if let Some(event) = self.buckets[idx].events.iter().find(|e| e.ty == ty) {
                log::debug!("subscription {} rejoined: {}", event.id, event.name);
                return Ok(Subscription {
                    id: event.id,
                    name: event.name.clone(),
                    receiver: event.channel.subscribe(),
                });
            }
        }

        let id = self.allocate_id()?;
        let name = format!("{}@{}ms", ty.name(), period);
        let (channel, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let event = Event {
            id,
            name: name.clone(),
            ty,
            channel,
        };
        match pos {
            Ok(idx) => self.buckets[idx].events.push(event),
            Err(idx) => self.buckets.insert(
                idx,
                PeriodBucket {
                    period,
                    last: None,
                    events: vec![event],
                },
            ),
        }
        self.ids.insert(id, period);
        log::debug!("subscription {} created: {}", id, name);
        Ok(Subscription { id, name, receiver })
    }

    /// Drop the subscription with the given id. Its channel closes and
    /// every listener sees the stream end.
    pub fn unsubscribe(&mut self, id: i32) -> Result<()> {
        let period = *self.ids.get(&id).ok_or(GpsError::BadId(id))?;
        self.ids.remove(&id);
        if let Ok(idx) = self.buckets.binary_search_by_key(&period, |b| b.period) {
            self.buckets[idx].events.retain(|e| e.id != id);
        }
        log::debug!("subscription {} removed", id);
        Ok(())
    }

    /// Service every due bucket: build the view once per subscription type
    /// and push it to all listeners. A subscription whose last listener
    /// went away is reclaimed on the spot; a bucket left empty is dropped
    /// by the next pass that meets it.
    pub fn dispatch<F>(&mut self, now: Instant, mut view: F)
    where
        F: FnMut(PositionType) -> Arc<Value>,
    {
        let ids = &mut self.ids;
        let mut i = 0;
        while i < self.buckets.len() {
            let bucket = &mut self.buckets[i];
            if bucket.events.is_empty() {
                self.buckets.remove(i);
                continue;
            }
            let due = match bucket.last {
                None => true,
                Some(last) => {
                    now.duration_since(last) >= Duration::from_millis(u64::from(bucket.period))
                }
            };
            if due {
                bucket.last = Some(now);
                bucket.events.retain(|event| {
                    if event.channel.send(view(event.ty)).is_ok() {
                        true
                    } else {
                        // the last receiver is gone
                        log::debug!("subscription {} lost its listeners", event.id);
                        ids.remove(&event.id);
                        false
                    }
                });
            }
            i += 1;
        }
    }

    fn allocate_id(&mut self) -> Result<i32> {
        if self.ids.len() >= i32::MAX as usize {
            return Err(GpsError::OutOfMemory);
        }
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if self.next_id < 1 {
                self.next_id = 1;
            }
            if !self.ids.contains_key(&self.next_id) {
                return Ok(self.next_id);
            }
        }
    }
}
