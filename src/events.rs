/// Earthquake event catalog: immutable, ordered by origin time.

use std::collections::HashMap;

use crate::model::EarthquakeEvent;

#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    /// Sorted by (origin_time, event_id).
    events: Vec<EarthquakeEvent>,
    index: HashMap<String, usize>,
}

impl EventCatalog {
    /// Builds the catalog. A repeated event id keeps the last row.
    pub fn new(events: impl IntoIterator<Item = EarthquakeEvent>) -> Self {
        let mut by_id: HashMap<String, EarthquakeEvent> = HashMap::new();
        for event in events {
            by_id.insert(event.event_id.clone(), event);
        }

        let mut events: Vec<EarthquakeEvent> = by_id.into_values().collect();
        events.sort_by(|a, b| {
            a.origin_time
                .cmp(&b.origin_time)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });

        let index = events
            .iter()
            .enumerate()
            .map(|(i, e)| (e.event_id.clone(), i))
            .collect();

        Self { events, index }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find_event(&self, event_id: &str) -> Option<&EarthquakeEvent> {
        self.index.get(event_id).map(|&i| &self.events[i])
    }

    /// Events in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = &EarthquakeEvent> {
        self.events.iter()
    }

    /// Chronological events at or above `min_magnitude`, capped to `limit`.
    pub fn select(&self, min_magnitude: Option<f64>, limit: Option<usize>) -> Vec<&EarthquakeEvent> {
        self.events
            .iter()
            .filter(|e| min_magnitude.is_none_or(|m| e.magnitude >= m))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, magnitude: f64, day: u32) -> EarthquakeEvent {
        EarthquakeEvent {
            event_id: id.to_string(),
            magnitude,
            epicenter: GeoPoint::new(0.0, 0.0),
            origin_time: Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
            depth_km: None,
        }
    }

    #[test]
    fn test_events_are_chronological() {
        let catalog = EventCatalog::new(vec![event("c", 5.0, 3), event("a", 5.0, 1), event("b", 5.0, 2)]);
        let ids: Vec<_> = catalog.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_event_id_keeps_last_row() {
        let catalog = EventCatalog::new(vec![event("a", 5.0, 1), event("a", 6.5, 1)]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_event("a").unwrap().magnitude, 6.5);
    }

    #[test]
    fn test_select_filters_then_caps() {
        let catalog = EventCatalog::new(vec![
            event("a", 3.0, 1),
            event("b", 6.0, 2),
            event("c", 5.0, 3),
            event("d", 7.0, 4),
        ]);

        let picked: Vec<_> = catalog.select(Some(5.0), Some(2)).iter().map(|e| e.event_id.clone()).collect();
        assert_eq!(picked, vec!["b", "c"]);
        assert_eq!(catalog.select(None, None).len(), 4);
        assert!(catalog.select(Some(9.0), None).is_empty());
    }
}
