use serde::{Deserialize, Serialize};

/// Running averages for the find dialog.
///
/// Individual clicks are never reported; each sample folds into the
/// averages in O(1) and the totals go out once when the dialog closes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    string_length_average: f64,
    direction_down_average: f64,
    match_case_average: f64,
    samples: u32,
}

/// Point-in-time copy of the find-dialog averages, as reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FindDialogStats {
    pub string_length_average: f64,
    pub direction_down_average: f64,
    pub match_case_average: f64,
    #[serde(rename = "FindNextButtonClickedTotal")]
    pub find_next_clicked_total: u32,
}

fn fold_mean(average: f64, n: u32, x: f64) -> f64 {
    let n = f64::from(n);
    (average * n + x) / (n + 1.0)
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, string_length: u32, direction_down: bool, match_case: bool) {
        let n = self.samples;
        self.string_length_average = fold_mean(self.string_length_average, n, f64::from(string_length));
        self.direction_down_average = fold_mean(self.direction_down_average, n, f64::from(u8::from(direction_down)));
        self.match_case_average = fold_mean(self.match_case_average, n, f64::from(u8::from(match_case)));
        self.samples = n.saturating_add(1);
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn snapshot(&self) -> FindDialogStats {
        FindDialogStats {
            string_length_average: self.string_length_average,
            direction_down_average: self.direction_down_average,
            match_case_average: self.match_case_average,
            find_next_clicked_total: self.samples,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
