//! Alert text for Telegram (HTML parse mode).

use corner_engine::{candidate_lines, PressureSide, Signal};
use fixture_monitor::{LiveFixture, TeamRef};

/// League positions of (home, away), when the standings lookup worked.
pub type Ranks = (Option<u32>, Option<u32>);

/// Average corners per match of (home, away) over their recent games.
pub type TeamForm = (Option<f64>, Option<f64>);

const BET365: &str = "https://www.bet365.com/";

pub fn format_signal_alert(fx: &LiveFixture, s: &Signal, ranks: Ranks, form: TeamForm) -> String {
    let snap = &fx.snapshot;
    let pressure_note = match s.pressure_side {
        PressureSide::None => "weak".to_string(),
        PressureSide::Home => format!("{} pushing", escape_html(&fx.home_team.name)),
        PressureSide::Away => format!("{} pushing", escape_html(&fx.away_team.name)),
        PressureSide::Both => "both sides pushing".to_string(),
    };
    let competition = if fx.league_name.is_empty() { "?" } else { fx.league_name.as_str() };
    let status = if fx.status_long.is_empty() {
        String::new()
    } else {
        format!(" ({})", escape_html(&fx.status_long))
    };

    let mut txt = vec![
        format!("🚨 <b>CORNER SIGNAL {}</b> 🚨", escape_html(&s.tag)),
        format!(
            "<b>Match:</b> {} x {}",
            team_label(&fx.home_team, ranks.0),
            team_label(&fx.away_team, ranks.1)
        ),
        format!("<b>Competition:</b> {}", escape_html(competition)),
        format!(
            "<b>Minute:</b> {}'{} | <b>Score:</b> {} x {}",
            s.minute,
            status,
            snap.home_score,
            snap.away_score
        ),
        format!(
            "<b>Corners so far:</b> {} (H: {} - A: {})",
            s.total_corners, snap.home_corners, snap.away_corners
        ),
        format!(
            "<b>Attacks (H x A):</b> {} x {} | <b>Dangerous:</b> {} x {}",
            snap.home_attacks, snap.away_attacks, snap.home_dangerous_attacks, snap.away_dangerous_attacks
        ),
    ];
    if snap.home_possession > 0 || snap.away_possession > 0 {
        txt.push(format!(
            "<b>Possession:</b> {}% x {}%",
            snap.home_possession, snap.away_possession
        ));
    }
    txt.push(format!(
        "<b>P(≥{} corner{} in window):</b> {:.0}% (λ={:.2})",
        s.min_corners,
        if s.min_corners == 1 { "" } else { "s" },
        s.probability * 100.0,
        s.lambda
    ));
    txt.push(format!(
        "<b>Small venue:</b> {} | <b>Pressure:</b> {}",
        if s.small_venue { "✅" } else { "❌" },
        pressure_note
    ));
    if form.0.is_some() || form.1.is_some() {
        let avg = |v: Option<f64>| v.map_or_else(|| "?".to_string(), |a| format!("{a:.1}"));
        txt.push(format!(
            "<b>Corner avg (recent):</b> {} / {}",
            avg(form.0),
            avg(form.1)
        ));
    }

    txt.push("\n<b>Asian lines (win/push):</b>".to_string());
    for line in candidate_lines(s.total_corners, s.lambda).iter().take(3) {
        txt.push(format!(
            "Over {:.1} → {:.0}% / {:.0}%",
            line.line,
            line.p_win * 100.0,
            line.p_push * 100.0
        ));
    }

    txt.push(format!(
        "\n🔗 <a href=\"{}\">Bet365 search</a>",
        escape_html(&bet365_search_link(&fx.home_team.name, &fx.away_team.name))
    ));
    txt.push("<i>Heuristic estimate, not a calibrated model.</i>".to_string());
    txt.join("\n")
}

/// Search page for the match. Bet365 has no public deep links by event.
pub fn bet365_search_link(home: &str, away: &str) -> String {
    let query = format!("{home} vs {away}");
    match reqwest::Url::parse_with_params(BET365, &[("q", query.as_str())]) {
        Ok(url) => format!("{BET365}#/search?{}", url.query().unwrap_or_default()),
        Err(_) => BET365.to_string(),
    }
}

fn team_label(team: &TeamRef, rank: Option<u32>) -> String {
    match rank {
        Some(r) => format!("{} (#{})", escape_html(&team.name), r),
        None => escape_html(&team.name),
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
