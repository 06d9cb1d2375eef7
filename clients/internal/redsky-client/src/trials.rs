// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Trial operations
//!
//! All of these work on links: the trial collection and next-trial links
//! come from an [`Experiment`](redsky_api::Experiment)'s metadata, the report
//! link from the `Location` of a dispensed or created trial.

use redsky_api::{TrialAssignments, TrialList, TrialMeta, TrialValues, meta};
use reqwest::StatusCode;

use crate::error::{
    CREATE_TRIAL_ERRORS, LIST_TRIALS_ERRORS, NEXT_TRIAL_ERRORS, REPORT_TRIAL_ERRORS, classify,
};
use crate::{Client, Error, decode, with_json};

impl Client {
    /// List the trials of an experiment.
    pub async fn get_all_trials(&self, url: &str) -> Result<TrialList, Error> {
        let url = self.resolve(url)?;
        let response = self.execute(self.client.get(url)).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(classify(status, response.headers(), LIST_TRIALS_ERRORS));
        }
        decode(response).await
    }

    /// Submit a trial with caller-chosen assignments.
    ///
    /// Returns the report link of the new trial.
    pub async fn create_trial(
        &self,
        url: &str,
        assignments: &TrialAssignments,
    ) -> Result<String, Error> {
        let url = self.resolve(url)?;
        let request = with_json(self.client.post(url), assignments)?;
        let response = self.execute(request).await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(classify(status, response.headers(), CREATE_TRIAL_ERRORS));
        }

        let mut links = TrialMeta::default();
        meta::extract(response.headers(), &mut links);
        links.report_trial.ok_or(Error::MissingHeader("Location"))
    }

    /// Ask the dispenser for the next trial to run.
    ///
    /// A `503` means no trial is available yet; the error carries how long
    /// to wait before asking again. A `410` means the experiment is done and
    /// no amount of polling will produce another trial.
    pub async fn next_trial(&self, url: &str) -> Result<TrialAssignments, Error> {
        let url = self.resolve(url)?;
        let response = self.execute(self.client.post(url)).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(classify(status, response.headers(), NEXT_TRIAL_ERRORS));
        }

        let mut links = TrialMeta::default();
        meta::extract(response.headers(), &mut links);

        let mut trial: TrialAssignments = decode(response).await?;
        trial.meta = links;

        tracing::debug!(
            report_trial = trial.meta.report_trial.as_deref().unwrap_or("<none>"),
            assignments = trial.assignments.len(),
            "Dispensed trial"
        );
        Ok(trial)
    }

    /// Report the outcome of a trial to its report link.
    ///
    /// Values of a failed trial are dropped before sending. A report link
    /// accepts exactly one report.
    pub async fn report_trial(&self, url: &str, mut values: TrialValues) -> Result<(), Error> {
        if values.failed {
            values.values.clear();
        }

        let url = self.resolve(url)?;
        let request = with_json(self.client.post(url), &values)?;
        let response = self.execute(request).await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(classify(status, response.headers(), REPORT_TRIAL_ERRORS));
        }

        tracing::debug!(failed = values.failed, values = values.values.len(), "Reported trial");
        Ok(())
    }
}
