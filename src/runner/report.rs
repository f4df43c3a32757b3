use super::{Completed, Loaded};
use crate::imports::*;

impl Runner<Loaded> {
    /// Runs the standard reports in order, printing each one as soon as it is materialized.
    ///
    /// The engine session is closed before this returns, whether or not a report failed.
    /// Lines already printed stay printed when a later report fails.
    #[tracing::instrument(skip(self), fields(cutoff_date = %self.config.cutoff_date()))]
    pub async fn report(self) -> Result<Runner<Completed>> {
        let Runner {
            config,
            services,
            state: Loaded {
                session,
                objects_listed,
                files,
            },
        } = self;

        let outcome = run_reports(&session, &services, &config).await;
        let statements_executed = session.statements_executed();
        let reports = settle_session(outcome, session.close())?;

        let exported = match config.export_settings() {
            Some(settings) => export_reports(&settings, &reports).await?,
            None => Vec::new(),
        };

        Ok(Runner {
            config,
            services,
            state: Completed {
                summary: RunSummary {
                    objects_listed,
                    files,
                    statements_executed,
                    reports,
                    exported,
                },
            },
        })
    }
}

// A report failure wins over a close failure, which is then only logged.
fn settle_session<T>(outcome: Result<T>, closed: Result<()>) -> Result<T> {
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Failed to close engine session after report error");
            Err(err)
        }
    }
}

async fn run_reports(
    session: &EngineSession,
    services: &RunnerServices,
    config: &RunnerConfig,
) -> Result<Vec<ReportResult>> {
    let mut results = Vec::new();
    for query in ReportQuery::standard(EVENTS_TABLE, config.cutoff_date()) {
        let frame = session
            .query(query.sql().to_string())
            .await?
            .map_err(|source| IngestError::Query {
                report: query.name().to_string(),
                source,
            })?;
        let result = ReportResult::new(query, frame);
        tracing::debug!(
            report = result.name(),
            rows = result.frame().height(),
            "Report complete"
        );
        services
            .notify(&result.render(config.output_format())?)
            .await?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_tracing;

    #[test]
    fn test_settle_session_prefers_report_error() {
        init_tracing();
        let err = settle_session::<()>(
            Err(anyhow::anyhow!("report failed")),
            Err(anyhow::anyhow!("close failed")),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "report failed");
    }

    #[test]
    fn test_settle_session_surfaces_close_error() {
        let err = settle_session(Ok(3), Err(anyhow::anyhow!("close failed"))).unwrap_err();
        assert_eq!(err.to_string(), "close failed");
        assert_eq!(settle_session(Ok(3), Ok(())).unwrap(), 3);
        assert!(settle_session::<i32>(Err(anyhow::anyhow!("report failed")), Ok(())).is_err());
    }
}
