//! Single-entity statistics aggregation.

use std::cmp::Ordering;

use crate::models::{
    is_qualifying_session, is_race_session, DerivedStats, NonFinishKind, Position, RecordTree,
};

use super::{calculate_average, calculate_rate, round_to};

/// Running sums that do not appear in the final statistics.
#[derive(Debug, Default)]
struct Accumulator {
    position_sum: u64,
    qualifying_position_sum: u64,
    qualifying_finish_count: u32,
}

/// Compute derived statistics for one record tree in a single pass.
///
/// Never fails; malformed results are counted according to the position
/// normalizer's defaults.
pub fn aggregate(tree: &RecordTree) -> DerivedStats {
    let mut stats = DerivedStats::default();
    let mut acc = Accumulator::default();

    for leaf in tree.leaves() {
        let result = leaf.result;

        stats.championships.insert(leaf.championship.to_string());
        if let Some(team) = &result.team {
            stats.teams.insert(team.clone());
        }
        track_year(&mut stats, leaf.year);

        if is_race_session(leaf.session) {
            stats.races += 1;
            let season = stats.seasons.entry(leaf.year.to_string()).or_default();
            season.races += 1;
            if let Some(points) = result.points {
                stats.total_points += points;
                season.points += points;
            }

            match result.normalized() {
                Position::Finish(rank) => {
                    stats.finished_races += 1;
                    acc.position_sum += rank as u64;
                    if rank == 1 {
                        stats.wins += 1;
                        season.wins += 1;
                    }
                    if (2..=3).contains(&rank) {
                        stats.podiums += 1;
                        season.podiums += 1;
                    }
                    if rank <= 5 {
                        stats.top5 += 1;
                    }
                    if rank <= 10 {
                        stats.top10 += 1;
                    } else {
                        stats.other_finishes += 1;
                    }
                }
                Position::NonFinish(NonFinishKind::Dnf) => {
                    stats.dnf += 1;
                    season.dnf += 1;
                }
                Position::NonFinish(NonFinishKind::Dsq) => stats.dsq += 1,
                Position::NonFinish(NonFinishKind::Dns) => stats.dns += 1,
            }

            if result.has_fastest_lap() {
                stats.fastest_laps += 1;
            }
        }

        if is_qualifying_session(leaf.session) {
            stats.qualifying_sessions += 1;
            if let Position::Finish(rank) = result.normalized() {
                acc.qualifying_position_sum += rank as u64;
                acc.qualifying_finish_count += 1;
                if rank == 1 {
                    stats.poles += 1;
                }
            }
        }
    }

    finalize(&mut stats, &acc);
    stats
}

fn finalize(stats: &mut DerivedStats, acc: &Accumulator) {
    stats.avg_position = calculate_average(acc.position_sum, stats.finished_races);
    stats.avg_qualifying =
        calculate_average(acc.qualifying_position_sum, acc.qualifying_finish_count);
    stats.qualifying_vs_race_delta = if stats.avg_position > 0.0 && stats.avg_qualifying > 0.0 {
        round_to(stats.avg_position - stats.avg_qualifying, 2)
    } else {
        0.0
    };

    stats.win_rate = calculate_rate(stats.wins, stats.races);
    stats.podium_rate = calculate_rate(stats.podiums, stats.races);
    stats.finish_rate = calculate_rate(stats.finished_races, stats.races);
    stats.dnf_rate = calculate_rate(stats.dnf, stats.races);

    stats.total_points = round_to(stats.total_points, 2);
    for season in stats.seasons.values_mut() {
        season.points = round_to(season.points, 2);
    }
}

fn track_year(stats: &mut DerivedStats, year: &str) {
    let earlier = |a: &str, b: &str| compare_years(a, b) == Ordering::Less;

    match &stats.first_year {
        Some(first) if !earlier(year, first) => {}
        _ => stats.first_year = Some(year.to_string()),
    }
    match &stats.last_year {
        Some(last) if !earlier(last, year) => {}
        _ => stats.last_year = Some(year.to_string()),
    }
}

/// Chronological comparison, numeric when both keys parse.
pub(crate) fn compare_years(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i32>(), b.trim().parse::<i32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
