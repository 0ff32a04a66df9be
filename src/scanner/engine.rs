//! Synchronous detection over a batch of events.

use tracing::{instrument, warn};

use crate::detector::{
    Category, DetectionSettings, Detector, MiddleDetector, MiddleRecord, Opportunity, RunState,
    SurebetDetector, SurebetRecord, ValuebetDetector, ValuebetRecord,
};
use crate::metrics;
use crate::odds::{Event, MarketType, Sport};
use crate::sink::LeagueTally;

/// The three detectors run on every event.
#[derive(Debug, Clone, Default)]
pub struct Detectors {
    /// Surebet detector.
    pub surebet: SurebetDetector,
    /// Middle detector.
    pub middle: MiddleDetector,
    /// Valuebet detector.
    pub valuebet: ValuebetDetector,
}

impl Detectors {
    /// Build detectors from settings.
    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self {
            surebet: SurebetDetector::new(settings.surebet.clone()),
            middle: MiddleDetector::new(settings.middle.clone()),
            valuebet: ValuebetDetector::new(settings.value.clone()),
        }
    }
}

/// Records found on a batch of events.
#[derive(Debug, Clone, Default)]
pub struct DetectionBatch {
    /// Events scanned.
    pub events: usize,
    /// Surebets.
    pub surebets: Vec<SurebetRecord>,
    /// Middles.
    pub middles: Vec<MiddleRecord>,
    /// Valuebets.
    pub valuebets: Vec<ValuebetRecord>,
    /// Detector runs that failed.
    pub failures: usize,
}

impl DetectionBatch {
    /// Append another batch.
    pub fn merge(&mut self, other: DetectionBatch) {
        self.events += other.events;
        self.surebets.extend(other.surebets);
        self.middles.extend(other.middles);
        self.valuebets.extend(other.valuebets);
        self.failures += other.failures;
    }

    /// Record counts.
    pub fn tally(&self) -> LeagueTally {
        LeagueTally {
            surebets: self.surebets.len(),
            middles: self.middles.len(),
            valuebets: self.valuebets.len(),
        }
    }

    /// Records of one category as sink items.
    pub fn opportunities(&self, category: Category) -> Vec<Opportunity> {
        match category {
            Category::Surebets => self.surebets.iter().cloned().map(Opportunity::from).collect(),
            Category::Middles => self.middles.iter().cloned().map(Opportunity::from).collect(),
            Category::Valuebets => self.valuebets.iter().cloned().map(Opportunity::from).collect(),
        }
    }
}

/// Run every detector on every event of a sport.
///
/// A detector failing on an event is logged and counted; the event then
/// contributes no records for that detector.
#[instrument(skip_all, fields(sport = %sport.key, events = events.len()))]
pub fn detect_batch(
    events: &[Event],
    sport: &Sport,
    markets: &[MarketType],
    detectors: &Detectors,
    run: &mut RunState,
) -> DetectionBatch {
    let mut batch = DetectionBatch {
        events: events.len(),
        ..DetectionBatch::default()
    };

    for event in events {
        if !event.has_quotes() {
            continue;
        }
        run_detector(&detectors.surebet, event, sport, markets, run, &mut batch.surebets, &mut batch.failures);
        run_detector(&detectors.middle, event, sport, markets, run, &mut batch.middles, &mut batch.failures);
        run_detector(&detectors.valuebet, event, sport, markets, run, &mut batch.valuebets, &mut batch.failures);
    }

    batch
}

fn run_detector<D: Detector>(
    detector: &D,
    event: &Event,
    sport: &Sport,
    markets: &[MarketType],
    run: &mut RunState,
    records: &mut Vec<D::Record>,
    failures: &mut usize,
) {
    match detector.detect(event, sport, markets, run) {
        Ok(found) => records.extend(found),
        Err(e) => {
            warn!(
                detector = detector.name(),
                event = %event.id,
                error = %e,
                "Detector failed on event"
            );
            metrics::inc_detector_failures(detector.name());
            *failures += 1;
        }
    }
}
