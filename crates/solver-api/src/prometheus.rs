//! Prometheus text exposition of the dispatcher counters.

use solver_dispatch::StatsSnapshot;

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} counter\n"));
    out.push_str(&format!("{name} {value}\n"));
}

/// Render a snapshot in the Prometheus text format (v0.0.4).
pub fn render_prometheus(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();

    counter(
        &mut out,
        "solver_controller_messages_received_total",
        "Control messages received.",
        snapshot.received,
    );
    counter(
        &mut out,
        "solver_controller_messages_published_total",
        "Work items published to worker queues.",
        snapshot.published,
    );
    counter(
        &mut out,
        "solver_controller_messages_dropped_total",
        "Control messages acknowledged without routing.",
        snapshot.dropped,
    );
    counter(
        &mut out,
        "solver_controller_messages_requeued_total",
        "Control messages handed back for redelivery.",
        snapshot.requeued,
    );
    counter(
        &mut out,
        "solver_controller_broker_reconnects_total",
        "Broker sessions that ended and were retried.",
        snapshot.reconnects,
    );

    out.push_str("# HELP solver_controller_broker_connected Whether the broker session is up.\n");
    out.push_str("# TYPE solver_controller_broker_connected gauge\n");
    out.push_str(&format!(
        "solver_controller_broker_connected {}\n",
        u8::from(snapshot.connected)
    ));

    out
}
