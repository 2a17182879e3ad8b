use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchsheet::flashscore::parse_match_rows;
use matchsheet::leagues::PinnedLeagues;
use matchsheet::model::{MatchRecord, header_row};
use matchsheet::odds::{favorite_odds, passes_gate};
use matchsheet::reconcile::plan_reconciliation;

const MATCH_COUNT: usize = 300;

fn match_list_html(count: usize) -> String {
    let mut html = String::from(
        r#"<html><body><div id="left-menu">
<a class="leftMenu__href" href="/football/england/premier-league/">Premier League</a>
<a class="leftMenu__href" href="/football/spain/laliga/">LaLiga</a>
</div>"#,
    );
    for i in 0..count {
        html.push_str(&format!(
            r#"<div class="event__match"><a href="/match/m{i}/"></a>
<div class="event__participant">Home {i}</div><div class="event__participant">Away {i}</div>
<div class="odds__odd"><span>1.{:02}</span></div><div class="odds__odd"><span>4.10</span></div><div class="odds__odd"><span>6.30</span></div>
</div>"#,
            i % 100
        ));
    }
    html.push_str("</body></html>");
    html
}

fn record(i: usize) -> MatchRecord {
    MatchRecord {
        team1: format!("Home {i}"),
        team2: format!("Away {i}"),
        favorite_odds: 1.4,
        over_under_25: 1.85,
        first_half_over_05: 1.3,
        country: "ENGLAND".to_string(),
        league: "Premier League".to_string(),
        team1_value: None,
        team2_value: None,
    }
}

fn bench_match_list_parse(c: &mut Criterion) {
    let html = match_list_html(MATCH_COUNT);
    c.bench_function("match_list_parse", |b| {
        b.iter(|| {
            let rows = parse_match_rows(black_box(&html));
            let pinned = PinnedLeagues::from_menu_html(black_box(&html));
            let relevant = rows
                .iter()
                .filter_map(|row| favorite_odds(&row.raw_odds))
                .filter(|odd| passes_gate(*odd))
                .count();
            black_box((relevant, pinned.len()));
        })
    });
}

fn bench_reconcile_plan(c: &mut Criterion) {
    let mut rows = vec![header_row(), vec!["2026-10-19".to_string()]];
    rows.extend((0..MATCH_COUNT).map(|i| {
        let mut cells = vec![String::new()];
        cells.extend(record(i).to_cells());
        cells
    }));
    // Half the block survives, half is replaced.
    let incoming: Vec<MatchRecord> = (MATCH_COUNT / 2..MATCH_COUNT + MATCH_COUNT / 2)
        .map(record)
        .collect();

    c.bench_function("reconcile_plan", |b| {
        b.iter(|| {
            let plan = plan_reconciliation(black_box(&rows), 2, black_box(&incoming));
            black_box(plan.deletes.len() + plan.updates.len() + plan.inserts.len());
        })
    });
}

criterion_group!(benches, bench_match_list_parse, bench_reconcile_plan);
criterion_main!(benches);
