//! Problem and instance file URLs.

/// Composes the download URLs workers use for problem and instance files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemLinks {
    base: String,
}

impl ProblemLinks {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn problem_url(&self, problem_id: u64) -> String {
        format!("{}/problems/{problem_id}/file", self.base)
    }

    pub fn instance_url(&self, problem_id: u64, instance_id: u64) -> String {
        format!(
            "{}/problems/{problem_id}/instances/{instance_id}/file",
            self.base
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_problem_and_instance_urls() {
        let links = ProblemLinks::new("http://problems:8000/api");
        assert_eq!(links.problem_url(7), "http://problems:8000/api/problems/7/file");
        assert_eq!(
            links.instance_url(7, 3),
            "http://problems:8000/api/problems/7/instances/3/file"
        );
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        let a = ProblemLinks::new("http://problems/");
        let b = ProblemLinks::new("http://problems");
        assert_eq!(a, b);
        assert_eq!(a.problem_url(1), "http://problems/problems/1/file");
    }
}
