#![forbid(unsafe_code)]

pub mod ids {
    /// Coordination scope name. Projects are created on first reference, so
    /// the name is validated once here and trusted everywhere else.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ProjectName(String);

    impl ProjectName {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, ProjectNameError> {
            let value = value.into();
            validate_project_name(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ProjectNameError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    fn validate_project_name(value: &str) -> Result<(), ProjectNameError> {
        if value.is_empty() {
            return Err(ProjectNameError::Empty);
        }
        if value.len() > 128 {
            return Err(ProjectNameError::TooLong);
        }
        let Some(first) = value.chars().next() else {
            return Err(ProjectNameError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(ProjectNameError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '/' | '-' | ' ') {
                continue;
            }
            return Err(ProjectNameError::InvalidChar { ch, index });
        }
        Ok(())
    }

    /// Identity an agent process chooses for itself. Advisory, but it flows
    /// into lock ownership and job assignment, so it must stay printable.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct AgentId(String);

    impl AgentId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, AgentIdError> {
            let value = value.into();
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(AgentIdError::Empty);
            }
            if trimmed.len() > 128 {
                return Err(AgentIdError::TooLong);
            }
            if trimmed.chars().any(|ch| ch.is_control()) {
                return Err(AgentIdError::InvalidChar);
            }
            Ok(Self(trimmed.to_string()))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum AgentIdError {
        Empty,
        TooLong,
        InvalidChar,
    }
}

pub mod model {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Priority {
        Low,
        #[default]
        Medium,
        High,
        Critical,
    }

    impl Priority {
        pub fn as_str(self) -> &'static str {
            match self {
                Priority::Low => "low",
                Priority::Medium => "medium",
                Priority::High => "high",
                Priority::Critical => "critical",
            }
        }

        /// Claim ordering rank. Lower claims first.
        pub fn rank(self) -> u8 {
            match self {
                Priority::Critical => 0,
                Priority::High => 1,
                Priority::Medium => 2,
                Priority::Low => 3,
            }
        }

        pub fn parse(raw: &str) -> Option<Self> {
            match raw.trim().to_ascii_lowercase().as_str() {
                "low" => Some(Priority::Low),
                "medium" => Some(Priority::Medium),
                "high" => Some(Priority::High),
                "critical" => Some(Priority::Critical),
                _ => None,
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum JobStatus {
        Todo,
        InProgress,
        Done,
        Cancelled,
    }

    impl JobStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                JobStatus::Todo => "todo",
                JobStatus::InProgress => "in_progress",
                JobStatus::Done => "done",
                JobStatus::Cancelled => "cancelled",
            }
        }

        /// Terminal states are sinks: no transition leaves them.
        pub fn is_terminal(self) -> bool {
            matches!(self, JobStatus::Done | JobStatus::Cancelled)
        }

        pub fn parse(raw: &str) -> Option<Self> {
            match raw.trim().to_ascii_lowercase().as_str() {
                "todo" => Some(JobStatus::Todo),
                "in_progress" => Some(JobStatus::InProgress),
                "done" => Some(JobStatus::Done),
                "cancelled" | "canceled" => Some(JobStatus::Cancelled),
                _ => None,
            }
        }
    }

    /// Closed allow-list of job mutations the store accepts. Anything the
    /// surfaces cannot express through these variants never reaches a row.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum JobUpdate {
        SetStatus(JobStatus),
        SetPriority(Priority),
        SetAssignee(Option<String>),
        SetCancelReason(String),
    }
}
