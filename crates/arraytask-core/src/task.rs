//! Task-index mapping: scheduler task id to work offset and output filename.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default multiplier applied to a task id to get its work offset.
pub const DEFAULT_STRIDE: i64 = 100;

/// Default output filename; `{idx}` is replaced by the work offset.
pub const DEFAULT_OUTFILE_TEMPLATE: &str = "test_sample_idx{idx}.h5";

const IDX_PLACEHOLDER: &str = "{idx}";

/// Scheduler-assigned identifier of one instance within an array job.
///
/// Any `i64` is accepted, including negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Read the task id from `var` through `lookup`.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; tests pass a map.
    pub fn from_env<F>(var: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(var).ok_or_else(|| Error::MissingTaskId {
            var: var.to_string(),
        })?;
        if raw.trim().is_empty() {
            return Err(Error::MissingTaskId {
                var: var.to_string(),
            });
        }
        raw.parse()
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(TaskId)
            .map_err(|_| Error::InvalidTaskId {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output filename pattern with exactly one `{idx}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutfileTemplate(String);

impl OutfileTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };
        match template.matches(IDX_PLACEHOLDER).count() {
            0 => return Err(invalid("missing {idx} placeholder")),
            1 => {}
            _ => return Err(invalid("{idx} placeholder appears more than once")),
        }
        if template.contains('/') || template.contains('\\') {
            return Err(invalid("must be a bare filename"));
        }
        Ok(Self(template.to_string()))
    }

    pub fn render(&self, idx: i64) -> String {
        self.0.replacen(IDX_PLACEHOLDER, &idx.to_string(), 1)
    }
}

impl Default for OutfileTemplate {
    fn default() -> Self {
        Self(DEFAULT_OUTFILE_TEMPLATE.to_string())
    }
}

impl TryFrom<String> for OutfileTemplate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<OutfileTemplate> for String {
    fn from(value: OutfileTemplate) -> Self {
        value.0
    }
}

/// The unit of work one task instance processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkUnit {
    pub task: TaskId,
    pub idx: i64,
    pub outfile: String,
}

/// Pure mapping from task id to [`WorkUnit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMapper {
    stride: i64,
    template: OutfileTemplate,
}

impl TaskMapper {
    pub fn new(stride: i64, template: OutfileTemplate) -> Self {
        Self { stride, template }
    }

    /// `task * stride`, rejecting results that do not fit in an `i64`.
    pub fn offset(&self, task: TaskId) -> Result<i64> {
        task.0
            .checked_mul(self.stride)
            .ok_or(Error::OffsetOverflow {
                task: task.0,
                stride: self.stride,
            })
    }

    pub fn map(&self, task: TaskId) -> Result<WorkUnit> {
        let idx = self.offset(task)?;
        Ok(WorkUnit {
            task,
            idx,
            outfile: self.template.render(idx),
        })
    }
}

impl Default for TaskMapper {
    fn default() -> Self {
        Self::new(DEFAULT_STRIDE, OutfileTemplate::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn unit(task: i64) -> WorkUnit {
        TaskMapper::default().map(TaskId(task)).unwrap()
    }

    #[test]
    fn default_mapping_scenarios() {
        for (task, idx, outfile) in [
            (0, 0, "test_sample_idx0.h5"),
            (1, 100, "test_sample_idx100.h5"),
            (7, 700, "test_sample_idx700.h5"),
            (-1, -100, "test_sample_idx-100.h5"),
        ] {
            let u = unit(task);
            assert_eq!(u.idx, idx, "idx for task {task}");
            assert_eq!(u.outfile, outfile, "outfile for task {task}");
        }
    }

    #[test]
    fn offset_is_exact_product() {
        let mapper = TaskMapper::default();
        for t in [-5_000_000_000_i64, -3, 0, 2, 12_345, 92_233_720_368_547_758] {
            assert_eq!(mapper.offset(TaskId(t)).unwrap(), t * 100);
        }
    }

    #[test]
    fn mapping_is_repeatable() {
        let mapper = TaskMapper::default();
        assert_eq!(mapper.map(TaskId(42)).unwrap(), mapper.map(TaskId(42)).unwrap());
    }

    #[test]
    fn overflow_is_rejected() {
        let err = TaskMapper::default().map(TaskId(i64::MAX)).unwrap_err();
        assert!(matches!(err, Error::OffsetOverflow { stride: 100, .. }));
        assert!(TaskMapper::default().map(TaskId(i64::MIN / 99)).is_err());
    }

    #[test]
    fn custom_stride_and_template() {
        let mapper = TaskMapper::new(25, OutfileTemplate::parse("patch_{idx}.h5").unwrap());
        let u = mapper.map(TaskId(3)).unwrap();
        assert_eq!(u.idx, 75);
        assert_eq!(u.outfile, "patch_75.h5");
    }

    #[test]
    fn task_id_parsing() {
        assert_eq!(" 12\n".parse::<TaskId>().unwrap(), TaskId(12));
        assert_eq!("-1".parse::<TaskId>().unwrap(), TaskId(-1));
        for bad in ["", "abc", "1.5", "0x10", "99999999999999999999"] {
            assert!(
                matches!(bad.parse::<TaskId>(), Err(Error::InvalidTaskId { .. })),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn task_id_from_env_lookup() {
        let env: HashMap<&str, &str> =
            HashMap::from([("SLURM_ARRAY_TASK_ID", "7"), ("BLANK", "  ")]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        assert_eq!(TaskId::from_env("SLURM_ARRAY_TASK_ID", lookup).unwrap(), TaskId(7));
        let err = TaskId::from_env("UNSET", lookup).unwrap_err();
        assert!(err.to_string().contains("$UNSET"));
        assert!(matches!(
            TaskId::from_env("BLANK", lookup),
            Err(Error::MissingTaskId { .. })
        ));
    }

    #[test]
    fn template_validation() {
        assert!(OutfileTemplate::parse("out.h5").is_err());
        assert!(OutfileTemplate::parse("{idx}_{idx}.h5").is_err());
        assert!(OutfileTemplate::parse("out/{idx}.h5").is_err());
        assert_eq!(OutfileTemplate::parse("{idx}").unwrap().render(-3), "-3");
    }
}
