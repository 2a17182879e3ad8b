/// `(team1, team2)` exactly as scraped. No case folding or accent stripping.
pub type MatchKey = (String, String);

/// Sheet header row, column A through H.
pub const HEADER: [&str; 8] = [
    "date",
    "team1",
    "team2",
    "favoriteOdds",
    "overUnder25",
    "firstHalfOver05",
    "team1Value",
    "team2Value",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub team1: String,
    pub team2: String,
    pub favorite_odds: f64,
    pub over_under_25: f64,
    pub first_half_over_05: f64,
    pub country: String,
    pub league: String,
    pub team1_value: Option<String>,
    pub team2_value: Option<String>,
}

impl MatchRecord {
    pub fn key(&self) -> MatchKey {
        (self.team1.clone(), self.team2.clone())
    }

    /// Cells for columns B..H. Missing valuations become empty cells.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.team1.clone(),
            self.team2.clone(),
            format_odd(self.favorite_odds),
            format_odd(self.over_under_25),
            format_odd(self.first_half_over_05),
            self.team1_value.clone().unwrap_or_default(),
            self.team2_value.clone().unwrap_or_default(),
        ]
    }
}

pub fn header_row() -> Vec<String> {
    HEADER.iter().map(|s| s.to_string()).collect()
}

pub fn format_odd(value: f64) -> String {
    format!("{value}")
}

pub fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}
