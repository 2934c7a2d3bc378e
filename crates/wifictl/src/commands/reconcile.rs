//! `wifictl reconcile`: drive an engine over a snapshot and an intent
//! document on a virtual clock until no timer is left.
//!
//! The driver side is a loopback: every computed tree is applied
//! verbatim and reported back as live events. Rows land in a
//! [`MemoryDb`] and deauthentications in a [`RecordingKicker`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;
use tokio::time::Instant;
use tracing::{debug, info};

use wifictl_core::policy::{KickRecord, RecordingKicker};
use wifictl_core::wps::WpsJobInfo;
use wifictl_core::{
    ConfigTree, Engine, EngineConfig, IntentDocument, LiveEvent, LiveSnapshot, MemoryDb, Row,
    Table, WpsJobEvent, WpsMethod, WpsRole,
};

use crate::cli::{GlobalOpts, ReconcileArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

const TABLES: [Table; 4] = [
    Table::RadioState,
    Table::InterfaceState,
    Table::Station,
    Table::StationMld,
];

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Report {
    /// Virtual time the engine needed to go idle.
    settled_after_ms: u64,
    turns: u32,
    consistent: bool,
    tree: Arc<ConfigTree>,
    rows: BTreeMap<String, BTreeMap<String, Row>>,
    writes: usize,
    kicks: Vec<KickRecord>,
    wps_jobs: Vec<WpsJobInfo>,
    wps_events: Vec<WpsJobEvent>,
}

#[derive(Tabled)]
struct InterfaceRow {
    radio: String,
    interface: String,
    kind: String,
    enabled: bool,
    ssid: String,
    channel: String,
}

#[derive(Tabled)]
struct RadioRow {
    radio: String,
    enabled: bool,
    channel: String,
    #[tabled(rename = "radar next")]
    radar_next: String,
    #[tabled(rename = "mbss tx")]
    mbss_tx: String,
}

#[derive(Tabled)]
struct DbRow {
    table: String,
    key: String,
    row: String,
}

#[derive(Tabled)]
struct KickRow {
    interface: String,
    station: String,
    reason: u16,
}

#[derive(Tabled)]
struct JobRow {
    interface: String,
    state: String,
    result: String,
}

fn render_table(report: &Report) -> String {
    let radios: Vec<RadioRow> = report
        .tree
        .radios
        .values()
        .map(|r| RadioRow {
            radio: r.name.clone(),
            enabled: r.enabled,
            channel: util::channel_label(r.channel.as_ref()),
            radar_next: util::channel_label(r.radar_next_channel.as_ref()),
            mbss_tx: r.mbss_tx_iface.clone().unwrap_or_else(|| "-".into()),
        })
        .collect();
    let interfaces: Vec<InterfaceRow> = report
        .tree
        .radios
        .values()
        .flat_map(|r| {
            r.interfaces.values().map(|i| InterfaceRow {
                radio: r.name.clone(),
                interface: i.name.clone(),
                kind: i.kind.to_string(),
                enabled: i.enabled,
                ssid: i.ap.as_ref().map_or_else(String::new, |ap| ap.ssid.clone()),
                channel: util::channel_label(i.ap.as_ref().and_then(|ap| ap.channel.as_ref())),
            })
        })
        .collect();
    let rows: Vec<DbRow> = report
        .rows
        .iter()
        .flat_map(|(table, rows)| {
            rows.iter().map(|(key, row)| DbRow {
                table: table.clone(),
                key: key.clone(),
                row: serde_json::to_string(row).unwrap_or_default(),
            })
        })
        .collect();
    let kicks: Vec<KickRow> = report
        .kicks
        .iter()
        .map(|k| KickRow {
            interface: k.interface.clone(),
            station: k.mac.to_string(),
            reason: k.reason,
        })
        .collect();
    let jobs: Vec<JobRow> = report
        .wps_jobs
        .iter()
        .map(|j| JobRow {
            interface: j.interface.clone(),
            state: j.state.to_string(),
            result: j.result.map_or_else(|| "-".into(), |r| r.to_string()),
        })
        .collect();

    [
        output::section("Radios", &radios),
        output::section("Interfaces", &interfaces),
        output::section("Rows", &rows),
        output::section("Kicks", &kicks),
        output::section("WPS jobs", &jobs),
        format!(
            "Settled after {} ms ({} turns, {} writes, {})",
            report.settled_after_ms,
            report.turns,
            report.writes,
            if report.consistent {
                "consistent"
            } else {
                "inconsistent"
            },
        ),
    ]
    .join("\n\n")
}

// ── Simulation ──────────────────────────────────────────────────────

struct Simulation {
    engine: Engine,
    db: MemoryDb,
    kicker: RecordingKicker,
    start: Instant,
    now: Instant,
    turns: u32,
    max_turns: u32,
    wps_events: Vec<WpsJobEvent>,
}

impl Simulation {
    fn new(config: EngineConfig, max_turns: u32) -> Self {
        let db = MemoryDb::new();
        let kicker = RecordingKicker::new();
        let engine = Engine::new(config, Box::new(db.clone()), Box::new(kicker.clone()));
        let now = Instant::now();
        Self {
            engine,
            db,
            kicker,
            start: now,
            now,
            turns: 0,
            max_turns,
            wps_events: Vec::new(),
        }
    }

    /// One driver round trip without advancing the clock.
    fn round_trip(&mut self) {
        let events = self.engine.loopback(self.now);
        self.wps_events.extend(self.engine.take_wps_events());
        debug!(events, "loopback");
    }

    /// Jump from deadline to deadline until none is left.
    fn settle(&mut self) -> Result<(), CliError> {
        while self.turns < self.max_turns {
            self.round_trip();
            let Some(at) = self.engine.next_deadline() else {
                return Ok(());
            };
            self.turns += 1;
            self.now = self.now.max(at);
            self.engine.poll(self.now);
        }
        Err(CliError::Unsettled {
            turns: self.max_turns,
        })
    }

    fn report(mut self) -> Report {
        let tree = self.engine.config_tree();
        let consistent = self
            .engine
            .sync()
            .is_consistent(&self.engine.sync_context());
        let mut rows = BTreeMap::new();
        for table in TABLES {
            let table_rows: BTreeMap<String, Row> = self.db.rows(table).into_iter().collect();
            if !table_rows.is_empty() {
                rows.insert(table.to_string(), table_rows);
            }
        }
        Report {
            settled_after_ms: u64::try_from((self.now - self.start).as_millis())
                .unwrap_or(u64::MAX),
            turns: self.turns,
            consistent,
            tree,
            rows,
            writes: self.db.ops().len(),
            kicks: self.kicker.kicks(),
            wps_jobs: self.engine.wps_jobs(),
            wps_events: std::mem::take(&mut self.wps_events),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ReconcileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = util::load_settings(global)?;
    let config = settings.to_engine_config()?;
    let document: IntentDocument = util::read_input(&args.intent)?;
    let snapshot: LiveSnapshot = util::read_input(&args.state)?;
    let events: Vec<LiveEvent> = match &args.events {
        Some(path) => util::read_input(path)?,
        None => Vec::new(),
    };

    let mut sim = Simulation::new(config, args.max_turns);
    let now = sim.now;
    sim.engine.apply_snapshot(snapshot, now);
    sim.engine.apply_document(document, now)?;
    for iface in &args.wps_pbc {
        let id = sim.engine.wps_alloc(iface, WpsRole::Enroller, WpsMethod::Pbc)?;
        sim.engine.wps_start(id, now)?;
        info!(%id, interface = %iface, "wps job started");
    }

    sim.round_trip();
    if !events.is_empty() {
        info!(count = events.len(), "replaying live events");
        for event in events {
            sim.engine.apply_live(event, sim.now);
        }
    }
    sim.settle()?;

    let report = sim.report();
    info!(
        turns = report.turns,
        writes = report.writes,
        consistent = report.consistent,
        "engine settled"
    );
    let rendered = output::render(global.output, &report, render_table)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
