use indicatif::*;

pub struct ProgressReporter {
    pb: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total_work: usize, title: &str) -> Self {
        let template = format!("{{spinner:.bold.green}} {}: ", title)
            + "[{wide_bar:.cyan}]  ({elapsed_precise}|{eta_precise}) ";
        let pb = ProgressBar::new(total_work as u64);
        if let Ok(style) = ProgressStyle::with_template(&template) {
            pb.set_style(style.progress_chars("█▇▆▅▄▃▂▁  "));
        }
        pb.tick();
        ProgressReporter { pb }
    }

    pub fn hidden() -> Self {
        ProgressReporter {
            pb: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, num: usize) {
        if num != 0 {
            self.pb.inc(num as u64);
        }
    }

    pub fn done(&self) {
        self.pb.finish();
    }
}
