//! Scheduler array range expressions (`0-9`, `1,3,5-7`, `0-99:10%4`).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::task::{TaskId, TaskMapper, WorkUnit};

/// Upper bound on the number of task ids one expression may list
/// (SLURM's `MaxArraySize` ceiling).
pub const MAX_ARRAY_TASKS: u64 = 4_000_001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArrayRange {
    start: i64,
    end: i64,
    step: i64,
}

impl ArrayRange {
    fn ids(self) -> impl Iterator<Item = TaskId> {
        (self.start..=self.end)
            .step_by(self.step as usize)
            .map(TaskId)
    }

    fn count(self) -> u64 {
        ((self.end - self.start) / self.step) as u64 + 1
    }
}

/// Parsed array expression. The `%limit` throttle only bounds how many
/// tasks the scheduler runs at once; it does not change the id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySpec {
    ranges: Vec<ArrayRange>,
    count: usize,
    limit: Option<u32>,
}

impl ArraySpec {
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Task ids in listed order; duplicates are kept.
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ranges.iter().flat_map(|r| r.ids())
    }

    /// Number of task ids listed, never more than [`MAX_ARRAY_TASKS`].
    pub fn task_count(&self) -> usize {
        self.count
    }
}

impl FromStr for ArraySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidArraySpec {
            spec: s.to_string(),
            reason,
        };

        let (body, limit) = match s.trim().split_once('%') {
            Some((body, limit)) => {
                let limit = limit
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|l| *l > 0)
                    .ok_or_else(|| invalid(format!("bad throttle '{limit}'")))?;
                (body, Some(limit))
            }
            None => (s.trim(), None),
        };

        let mut ranges = Vec::new();
        let mut count: u64 = 0;
        for item in body.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(invalid("empty item".into()));
            }
            let range = parse_item(item).map_err(invalid)?;
            count = count.saturating_add(range.count());
            if count > MAX_ARRAY_TASKS {
                return Err(invalid(format!(
                    "lists more than {MAX_ARRAY_TASKS} task ids"
                )));
            }
            ranges.push(range);
        }
        Ok(Self {
            ranges,
            count: count as usize,
            limit,
        })
    }
}

fn parse_item(item: &str) -> std::result::Result<ArrayRange, String> {
    let number = |text: &str| {
        text.trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| format!("bad task id '{text}'"))
    };

    let (range, step) = match item.split_once(':') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };

    let (start, end) = match range.split_once('-') {
        Some((start, end)) => (number(start)?, number(end)?),
        None => {
            if step.is_some() {
                return Err(format!("step without range in '{item}'"));
            }
            let id = number(range)?;
            (id, id)
        }
    };
    if start > end {
        return Err(format!("range '{item}' ends before it starts"));
    }

    let step = match step {
        Some(text) => text
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("bad step '{text}'"))?,
        None => 1,
    };
    Ok(ArrayRange { start, end, step })
}

impl fmt::Display for ArraySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if r.start == r.end {
                write!(f, "{}", r.start)?;
            } else {
                write!(f, "{}-{}", r.start, r.end)?;
                if r.step != 1 {
                    write!(f, ":{}", r.step)?;
                }
            }
        }
        if let Some(limit) = self.limit {
            write!(f, "%{limit}")?;
        }
        Ok(())
    }
}

/// Map every task id in `spec`, stopping at the first failure.
pub fn plan(mapper: &TaskMapper, spec: &ArraySpec) -> Result<Vec<WorkUnit>> {
    spec.task_ids().map(|t| mapper.map(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(spec: &str) -> Vec<i64> {
        spec.parse::<ArraySpec>()
            .unwrap()
            .task_ids()
            .map(TaskId::get)
            .collect()
    }

    #[test]
    fn parses_common_forms() {
        assert_eq!(ids("0-3"), vec![0, 1, 2, 3]);
        assert_eq!(ids("5"), vec![5]);
        assert_eq!(ids("1,3,5-7"), vec![1, 3, 5, 6, 7]);
        assert_eq!(ids("0-9:3"), vec![0, 3, 6, 9]);
        assert_eq!(ids("0-10:4"), vec![0, 4, 8]);
    }

    #[test]
    fn throttle_is_kept_but_does_not_filter() {
        let spec: ArraySpec = "0-9:3%2".parse().unwrap();
        assert_eq!(spec.limit(), Some(2));
        assert_eq!(spec.task_count(), 4);
        assert_eq!(spec.to_string(), "0-9:3%2");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "3-1", "a-b", "1,,2", "0-9:0", "4:2", "-1", "0-5%0", "0-5%x"] {
            assert!(
                matches!(bad.parse::<ArraySpec>(), Err(Error::InvalidArraySpec { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn oversized_arrays_are_rejected() {
        let spec: ArraySpec = "0-4000000".parse().unwrap();
        assert_eq!(spec.task_count(), 4_000_001);

        for bad in [
            "0-4000001",
            "0-2000000,0-2000000",
            "0-9223372036854775807,0-9223372036854775807",
            "0-100000000000",
        ] {
            let err = bad.parse::<ArraySpec>().unwrap_err();
            assert!(
                err.to_string().contains("lists more than 4000001 task ids"),
                "{bad:?}: {err}"
            );
        }
    }

    #[test]
    fn plan_maps_each_task() {
        let spec: ArraySpec = "0-2,7".parse().unwrap();
        let units = plan(&TaskMapper::default(), &spec).unwrap();
        let files: Vec<_> = units.iter().map(|u| u.outfile.as_str()).collect();
        assert_eq!(
            files,
            [
                "test_sample_idx0.h5",
                "test_sample_idx100.h5",
                "test_sample_idx200.h5",
                "test_sample_idx700.h5",
            ]
        );
    }
}
