//! Plain-text exposition of the kill counters.
//!
//! Output is line-oriented `name value` pairs with `# HELP`/`# TYPE`
//! declarations, so a Prometheus scraper can read it as well as a human.

use crate::collector::KillCounters;

/// Render counters for the `/chaosmetrics` endpoint.
pub fn render_text(counters: &KillCounters) -> String {
    let mut out = String::new();
    let gauges = [
        (
            "pods_killed_last_5_min",
            "Pods killed by kube-monkey in the last 5 minutes.",
            counters.last_5_min,
        ),
        (
            "pods_killed_last_60_min",
            "Pods killed by kube-monkey in the last 60 minutes.",
            counters.last_60_min,
        ),
        (
            "pods_killed_last_24_hours",
            "Pods killed by kube-monkey in the last 24 hours.",
            counters.last_24_hours,
        ),
    ];

    for (name, help, value) in gauges {
        out.push_str(&format!("# HELP {name} {help}\n"));
        out.push_str(&format!("# TYPE {name} gauge\n"));
        out.push_str(&format!("{name} {value}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_zero() {
        let output = render_text(&KillCounters::default());
        assert!(output.contains("# TYPE pods_killed_last_5_min gauge"));
        assert!(output.contains("pods_killed_last_5_min 0\n"));
        assert!(output.contains("pods_killed_last_60_min 0\n"));
        assert!(output.contains("pods_killed_last_24_hours 0\n"));
    }

    #[test]
    fn render_counts() {
        let output = render_text(&KillCounters {
            last_5_min: 1,
            last_60_min: 4,
            last_24_hours: 9,
        });

        assert!(output.contains("pods_killed_last_5_min 1\n"));
        assert!(output.contains("pods_killed_last_60_min 4\n"));
        assert!(output.contains("pods_killed_last_24_hours 9\n"));
        // Three declarations and one sample per gauge.
        assert_eq!(output.lines().count(), 9);
    }
}
