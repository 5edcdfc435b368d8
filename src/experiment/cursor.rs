//! Iteration protocol - advancing an experiment one trial at a time
//!
//! The cursor never stops on its own when the experiment is paused,
//! skipped or timed out between steps. The driving loop checks
//! `is_running()` after every step and stops itself.
//!
//! Each operation validates before it mutates, so a returned error leaves
//! the record untouched.

use chrono::{DateTime, Utc};

use super::experiment_record::ExperimentRecord;
use super::lifecycle::Tracked;
use crate::status::Status;
use crate::{Error, Result};

impl ExperimentRecord {
    /// Move the cursor forward and return the index of the trial now
    /// running, or `None` once the sequence is exhausted.
    ///
    /// - `pending`: experiment starts and the first pending trial runs.
    /// - `paused`: experiment and current trial resume without moving.
    /// - `running`: a still-running current trial is finished, then the
    ///   next pending trial runs. Skipped trials are passed over.
    /// - no pending trial left: experiment finishes.
    /// - terminal: nothing changes.
    pub(crate) fn advance_at(&mut self, now: DateTime<Utc>) -> Result<Option<usize>> {
        match self.lifecycle.status() {
            status if status.is_terminal() => return Ok(None),
            Status::Pending => self.lifecycle.transition_at(Status::Running, now)?,
            Status::Paused => {
                self.lifecycle.transition_at(Status::Running, now)?;
                if let Some(index) = self.resume_current_at(now)? {
                    return Ok(Some(index));
                }
            }
            _ => {}
        }

        let from = match self.trial_index {
            None => 0,
            Some(index) => {
                if let Some(previous) = self.trials.get_mut(index) {
                    if previous.is_running() {
                        // Trial ended because the next one began.
                        previous.transition_at(Status::Finished, now)?;
                    }
                }
                index + 1
            }
        };

        match (from..self.trials.len()).find(|&i| self.trials[i].is_pending()) {
            Some(index) => {
                self.trial_index = Some(index);
                self.trials[index].transition_at(Status::Running, now)?;
                tracing::debug!(trial_index = index, "advanced to trial");
                Ok(Some(index))
            }
            None => {
                self.lifecycle.transition_at(Status::Finished, now)?;
                tracing::debug!("trial sequence exhausted");
                Ok(None)
            }
        }
    }

    /// `running -> paused`, pausing the running current trial too.
    pub(crate) fn pause_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.lifecycle.transition_at(Status::Paused, now)?;
        if let Ok(trial) = self.current_trial_mut() {
            if trial.is_running() {
                trial.transition_at(Status::Paused, now)?;
            }
        }
        Ok(())
    }

    /// `pending -> skipped`; every trial is skipped with it.
    pub(crate) fn skip_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.lifecycle.transition_at(Status::Skipped, now)?;
        self.skip_pending_from(0, now)
    }

    /// `running -> timed_out`; the running current trial times out and
    /// pending trials are skipped.
    pub(crate) fn time_out_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.lifecycle.transition_at(Status::TimedOut, now)?;
        self.close_out_at(Status::TimedOut, now)
    }

    /// `running -> finished` before the sequence is exhausted; the running
    /// current trial finishes and pending trials are skipped.
    pub(crate) fn finish_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.lifecycle.transition_at(Status::Finished, now)?;
        self.close_out_at(Status::Finished, now)
    }

    /// Current trial `running -> finished`.
    pub(crate) fn finish_trial_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.current_trial_mut()?
            .transition_at(Status::Finished, now)
    }

    /// Current trial `running -> timed_out`.
    pub(crate) fn time_out_trial_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.current_trial_mut()?
            .transition_at(Status::TimedOut, now)
    }

    /// Trial at `index` `pending -> skipped`.
    pub(crate) fn skip_trial_at(&mut self, index: usize, now: DateTime<Utc>) -> Result<()> {
        let len = self.trials.len();
        self.trials
            .get_mut(index)
            .ok_or_else(|| Error::InvalidInput(format!("no trial {index} in {len} trials")))?
            .transition_at(Status::Skipped, now)
    }

    /// Crash recovery: a running experiment becomes paused.
    ///
    /// Returns whether anything changed.
    pub(crate) fn reconcile_at(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if self.lifecycle.status().is_running() {
            self.pause_at(now)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // Bring the paused current trial back. `None` means there is no trial
    // left to resume and the cursor should move on.
    fn resume_current_at(&mut self, now: DateTime<Utc>) -> Result<Option<usize>> {
        let Some(index) = self.trial_index else {
            return Ok(None);
        };
        match self.trials.get_mut(index) {
            Some(trial) if trial.is_paused() => {
                trial.transition_at(Status::Running, now)?;
                tracing::debug!(trial_index = index, "resumed trial");
                Ok(Some(index))
            }
            Some(trial) if trial.is_running() => Ok(Some(index)),
            _ => Ok(None),
        }
    }

    fn close_out_at(&mut self, terminal: Status, now: DateTime<Utc>) -> Result<()> {
        let from = match self.trial_index {
            None => 0,
            Some(index) => {
                if let Some(trial) = self.trials.get_mut(index) {
                    if trial.is_running() {
                        trial.transition_at(terminal, now)?;
                    }
                }
                index + 1
            }
        };
        self.skip_pending_from(from, now)
    }

    fn skip_pending_from(&mut self, from: usize, now: DateTime<Utc>) -> Result<()> {
        for trial in self.trials.iter_mut().skip(from) {
            if trial.is_pending() {
                trial.transition_at(Status::Skipped, now)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::Trial;
    use chrono::{TimeDelta, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn experiment(n: u32) -> ExperimentRecord {
        let mut record = ExperimentRecord::new("p001", "stroop");
        for i in 0..n {
            record
                .append_trial(Trial::builder().trial_number(i).build())
                .unwrap();
        }
        record
    }

    fn statuses(record: &ExperimentRecord) -> Vec<Status> {
        record.trials().iter().map(Tracked::status).collect()
    }

    #[test]
    fn test_full_iteration() {
        let mut record = experiment(3);

        assert_eq!(record.advance_at(t(0)).unwrap(), Some(0));
        assert!(record.is_running());
        assert_eq!(record.advance_at(t(1)).unwrap(), Some(1));
        assert!(record.trial(0).unwrap().is_finished());
        assert!(record.is_running());
        assert_eq!(record.advance_at(t(2)).unwrap(), Some(2));
        assert_eq!(record.advance_at(t(3)).unwrap(), None);

        assert!(record.is_finished());
        assert_eq!(record.trial_index(), Some(2));
        assert_eq!(statuses(&record), vec![Status::Finished; 3]);
        assert_eq!(record.duration(), Some(3.0));

        assert_eq!(record.advance_at(t(4)).unwrap(), None);
        assert!(record.is_finished());
    }

    #[test]
    fn test_empty_experiment_finishes_immediately() {
        let mut record = experiment(0);
        assert_eq!(record.advance_at(t(0)).unwrap(), None);
        assert!(record.is_finished());
        assert!(record.trial_index().is_none());
    }

    #[test]
    fn test_explicitly_ended_trial_is_left_alone() {
        let mut record = experiment(2);
        record.advance_at(t(0)).unwrap();
        record.time_out_trial_at(t(5)).unwrap();
        record.advance_at(t(6)).unwrap();
        assert!(record.trial(0).unwrap().is_timed_out());
        assert!(record.trial(1).unwrap().is_running());
    }

    #[test]
    fn test_pause_and_resume_keeps_position() {
        let mut record = experiment(5);
        record.advance_at(t(0)).unwrap();
        record.advance_at(t(10)).unwrap();
        record.advance_at(t(20)).unwrap();
        assert_eq!(record.trial_index(), Some(2));

        record.pause_at(t(25)).unwrap();
        assert!(record.is_paused());
        assert!(record.current_trial().unwrap().is_paused());

        assert_eq!(record.advance_at(t(125)).unwrap(), Some(2));
        assert!(record.is_running());
        assert!(record.current_trial().unwrap().is_running());

        record.advance_at(t(130)).unwrap();
        record.advance_at(t(140)).unwrap();
        assert_eq!(record.advance_at(t(150)).unwrap(), None);

        // 150s wall clock, 100s of it paused.
        assert_eq!(record.duration(), Some(50.0));
        // Trial 2 ran 25..125 paused, ended at 130.
        assert_eq!(record.trial(2).unwrap().duration(), Some(10.0));
    }

    #[test]
    fn test_pause_before_start_is_invalid() {
        let mut record = experiment(2);
        let err = record.pause_at(t(0)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: Status::Pending,
                to: Status::Paused
            }
        ));
    }

    #[test]
    fn test_time_out_skips_remaining() {
        let mut record = experiment(4);
        record.advance_at(t(0)).unwrap();
        record.advance_at(t(1)).unwrap();
        record.time_out_at(t(2)).unwrap();

        assert!(record.is_timed_out());
        assert_eq!(
            statuses(&record),
            vec![
                Status::Finished,
                Status::TimedOut,
                Status::Skipped,
                Status::Skipped
            ]
        );
        assert_eq!(record.advance_at(t(3)).unwrap(), None);
        assert!(record.is_timed_out());
    }

    #[test]
    fn test_time_out_requires_running() {
        let mut record = experiment(1);
        assert!(record.time_out_at(t(0)).is_err());
        assert!(record.is_pending());
    }

    #[test]
    fn test_skip_pending_experiment_skips_all_trials() {
        let mut record = experiment(3);
        record.skip_at(t(0)).unwrap();
        assert!(record.is_skipped());
        assert!(record.duration().is_none());
        assert_eq!(statuses(&record), vec![Status::Skipped; 3]);
    }

    #[test]
    fn test_skip_started_experiment_fails() {
        let mut record = experiment(3);
        record.advance_at(t(0)).unwrap();
        assert!(record.skip_at(t(1)).is_err());
        assert!(record.is_running());
    }

    #[test]
    fn test_cursor_passes_over_skipped_trials() {
        let mut record = experiment(4);
        record.skip_trial_at(1, t(0)).unwrap();
        record.skip_trial_at(3, t(0)).unwrap();

        assert_eq!(record.advance_at(t(1)).unwrap(), Some(0));
        assert_eq!(record.advance_at(t(2)).unwrap(), Some(2));
        assert_eq!(record.advance_at(t(3)).unwrap(), None);
        assert_eq!(record.trial_index(), Some(2));
        assert!(record.is_finished());
    }

    #[test]
    fn test_skip_trial_must_be_pending() {
        let mut record = experiment(2);
        record.advance_at(t(0)).unwrap();
        assert!(matches!(
            record.skip_trial_at(0, t(1)),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            record.skip_trial_at(7, t(1)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_finish_early() {
        let mut record = experiment(3);
        record.advance_at(t(0)).unwrap();
        record.finish_at(t(4)).unwrap();
        assert!(record.is_finished());
        assert_eq!(
            statuses(&record),
            vec![Status::Finished, Status::Skipped, Status::Skipped]
        );
    }

    #[test]
    fn test_reconcile_only_touches_running() {
        let mut pending = experiment(1);
        assert!(!pending.reconcile_at(t(0)).unwrap());
        assert!(pending.is_pending());

        let mut running = experiment(2);
        running.advance_at(t(0)).unwrap();
        assert!(running.reconcile_at(t(1)).unwrap());
        assert!(running.is_paused());
        assert!(running.current_trial().unwrap().is_paused());
    }

    #[test]
    fn test_resume_after_current_trial_already_ended() {
        let mut record = experiment(3);
        record.advance_at(t(0)).unwrap();
        record.finish_trial_at(t(1)).unwrap();
        record.pause_at(t(2)).unwrap();

        assert_eq!(record.advance_at(t(3)).unwrap(), Some(1));
        assert!(record.trial(0).unwrap().is_finished());
    }
}
