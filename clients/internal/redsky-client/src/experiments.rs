// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Experiment operations

use redsky_api::{
    ENDPOINT_EXPERIMENTS, Experiment, ExperimentList, ExperimentListMeta, ExperimentListQuery,
    ExperimentMeta, ExperimentName, meta,
};
use reqwest::StatusCode;

use crate::error::{
    CREATE_EXPERIMENT_ERRORS, DELETE_EXPERIMENT_ERRORS, GET_EXPERIMENT_ERRORS,
    LIST_EXPERIMENTS_ERRORS, classify,
};
use crate::{Client, Error, decode, decode_optional, with_json};

fn collection() -> &'static str {
    ENDPOINT_EXPERIMENTS.trim_start_matches('/')
}

impl Client {
    /// List experiments, starting at the page described by `query`.
    ///
    /// Further pages are reached by passing `meta.next` of the result to
    /// [`Client::get_all_experiments_by_page`].
    pub async fn get_all_experiments(
        &self,
        query: &ExperimentListQuery,
    ) -> Result<ExperimentList, Error> {
        let mut url = self.endpoint(&[collection()]);
        let encoded = query.encode();
        if !encoded.is_empty() {
            url.set_query(Some(&encoded));
        }
        self.get_all_experiments_by_page(url.as_str()).await
    }

    /// Fetch one page of the experiment list from a `next`/`prev` link.
    pub async fn get_all_experiments_by_page(&self, url: &str) -> Result<ExperimentList, Error> {
        let url = self.resolve(url)?;
        let response = self.execute(self.client.get(url)).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(classify(status, response.headers(), LIST_EXPERIMENTS_ERRORS));
        }

        let mut list = ExperimentListMeta::default();
        meta::extract(response.headers(), &mut list);

        let mut experiments: ExperimentList = decode(response).await?;
        experiments.meta = list;
        Ok(experiments)
    }

    pub async fn get_experiment_by_name(&self, name: &ExperimentName) -> Result<Experiment, Error> {
        let url = self.endpoint(&[collection(), name.as_str()]);
        self.get_experiment(url.as_str()).await
    }

    /// Fetch an experiment from its `self` link.
    pub async fn get_experiment(&self, url: &str) -> Result<Experiment, Error> {
        let url = self.resolve(url)?;
        let response = self.execute(self.client.get(url)).await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(classify(status, response.headers(), GET_EXPERIMENT_ERRORS));
        }

        let mut links = ExperimentMeta::default();
        meta::extract(response.headers(), &mut links);

        let mut experiment: Experiment = decode(response).await?;
        experiment.meta = links;
        Ok(experiment)
    }

    /// Create or replace the experiment called `name`.
    ///
    /// Returns the experiment as stored by the server, with its links
    /// populated. If the server answers without a body the submitted
    /// definition is returned instead.
    pub async fn create_experiment(
        &self,
        name: &ExperimentName,
        experiment: &Experiment,
    ) -> Result<Experiment, Error> {
        let url = self.endpoint(&[collection(), name.as_str()]);
        let request = with_json(self.client.put(url), experiment)?;
        let response = self.execute(request).await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(classify(status, response.headers(), CREATE_EXPERIMENT_ERRORS));
        }

        let mut links = ExperimentMeta::default();
        meta::extract(response.headers(), &mut links);

        let mut created: Experiment = decode_optional(response)
            .await?
            .unwrap_or_else(|| experiment.clone());
        created.meta = links;

        tracing::info!(experiment = %name, status = %status, "Stored experiment");
        Ok(created)
    }

    /// Delete the experiment at its `self` link.
    pub async fn delete_experiment(&self, url: &str) -> Result<(), Error> {
        let url = self.resolve(url)?;
        let response = self.execute(self.client.delete(url)).await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(classify(status, response.headers(), DELETE_EXPERIMENT_ERRORS));
        }
        Ok(())
    }
}
