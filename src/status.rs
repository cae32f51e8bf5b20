use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    RetrievingVideoData,
    Pass1,
    Pass2,
}

impl Step {
    pub fn pass_number(self) -> u8 {
        match self {
            Step::Pass2 => 2,
            _ => 1,
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Step::RetrievingVideoData => "Retrieving video data",
            Step::Pass1 => "Pass 1",
            Step::Pass2 => "Pass 2",
        };
        write!(f, "{}", label)
    }
}

/// What the display layer shows. Overwritten in place after every state
/// transition and every progress line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusSnapshot {
    /// Replaces the structured fields when set (errors, completion, etc).
    pub override_message: Option<String>,
    pub file_name: String,
    /// 1-based position of the current job in the batch.
    pub file_index: usize,
    pub file_count: usize,
    pub step: Option<Step>,
    pub target_size: String,
    pub last_output: String,
    pub percent: f64,
    pub cancelled: bool,
}

impl StatusSnapshot {
    pub fn new() -> Self {
        StatusSnapshot::default()
    }

    pub fn progress(&self) -> u8 {
        if self.cancelled {
            return 0;
        }
        self.percent.clamp(0.0, 100.0) as u8
    }

    pub fn render(&self) -> String {
        if self.cancelled {
            return String::from("ABORTED");
        }
        if let Some(msg) = &self.override_message {
            return msg.clone();
        }

        let step = match self.step {
            Some(step) => step.to_string(),
            None => String::new(),
        };
        format!(
            "--Status--\nFile Name : {}\n File {}/{}\nCurrent Step : {}\nTarget Size : {}",
            self.file_name,
            self.file_index,
            self.file_count,
            step,
            self.target_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            file_name: String::from("clip.mp4"),
            file_index: 2,
            file_count: 3,
            step: Some(Step::Pass1),
            target_size: String::from("50MB"),
            percent: 41.9,
            ..StatusSnapshot::new()
        }
    }

    #[test]
    fn test_render_structured() {
        assert_eq!(
            snapshot().render(),
            "--Status--\nFile Name : clip.mp4\n File 2/3\nCurrent Step : Pass 1\nTarget Size : 50MB");
        assert_eq!(snapshot().progress(), 41);
    }

    #[test]
    fn test_override_supersedes_fields() {
        let mut s = snapshot();
        s.override_message = Some(String::from("The output folder is invalid!"));
        assert_eq!(s.render(), "The output folder is invalid!");
    }

    #[test]
    fn test_cancelled() {
        let mut s = snapshot();
        s.override_message = Some(String::from("whatever"));
        s.cancelled = true;
        assert_eq!(s.render(), "ABORTED");
        assert_eq!(s.progress(), 0);
    }

    #[test]
    fn test_step_labels() {
        assert_eq!(Step::RetrievingVideoData.to_string(), "Retrieving video data");
        assert_eq!(Step::Pass2.to_string(), "Pass 2");
        assert_eq!(Step::RetrievingVideoData.pass_number(), 1);
        assert_eq!(Step::Pass1.pass_number(), 1);
        assert_eq!(Step::Pass2.pass_number(), 2);
    }
}
