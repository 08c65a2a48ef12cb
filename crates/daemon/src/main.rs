use primgidromet::{
    get_config_info, setup_logger, Cli, Credentials, ForecastService, PageFetcher,
    ReqwestTransport, Session, SessionManager, StationService, Transport, Zone,
};
use slog::{debug, error, info, Logger};
use std::{sync::Arc, time::Duration};
use tokio::time::interval;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info()?;
    let logger = setup_logger(&cli);
    let credentials = cli.credentials()?;

    info!(logger, "Primgidromet scraper starting...");
    info!(logger, "  Login URL: {}", cli.login_url());
    info!(logger, "  Zones: {:?}", cli.zones());
    info!(logger, "  Cache lifetime: {} seconds", cli.refresh_interval());
    info!(logger, "  Fetch interval: {} seconds", cli.sleep_interval());

    let scraper = Scraper::new(&cli, logger.clone())?;
    if cli.once {
        return scraper.run_pass(&credentials, &mut None).await;
    }

    scrape_periodically(cli, logger, scraper, credentials).await;
    Ok(())
}

async fn scrape_periodically(cli: Cli, logger: Logger, scraper: Scraper, credentials: Credentials) {
    let sleep_between_checks = cli.sleep_interval();
    let mut session = None;

    let mut check_interval = interval(Duration::from_secs(sleep_between_checks));
    loop {
        check_interval.tick().await;
        match scraper.run_pass(&credentials, &mut session).await {
            Ok(_) => info!(
                logger,
                "Finished scraping, waiting {} seconds for next run", sleep_between_checks
            ),
            Err(err) => {
                error!(&logger, "Error scraping: {:#}", err);
                // next pass logs in from scratch; cached bodies may be the login page
                session = None;
                scraper.fetcher.clear().await;
            }
        }
    }
}

struct Scraper {
    logger: Logger,
    transport: Arc<dyn Transport>,
    session_manager: SessionManager,
    fetcher: Arc<PageFetcher>,
    stations: StationService,
    forecasts: ForecastService,
    zones: Vec<Zone>,
}

impl Scraper {
    fn new(cli: &Cli, logger: Logger) -> Result<Self, anyhow::Error> {
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(&cli.client_settings())?);
        let fetcher = Arc::new(PageFetcher::new(
            logger.clone(),
            cli.zone_base_url(),
            time::Duration::seconds(cli.refresh_interval() as i64),
        ));

        Ok(Scraper {
            session_manager: SessionManager::new(logger.clone(), cli.login_url()),
            stations: StationService::new(logger.clone(), fetcher.clone(), cli.source_offset()?),
            forecasts: ForecastService::new(logger.clone(), fetcher.clone()),
            fetcher,
            zones: cli.zones(),
            transport,
            logger,
        })
    }

    async fn run_pass(
        &self,
        credentials: &Credentials,
        session: &mut Option<Session>,
    ) -> Result<(), anyhow::Error> {
        let active = match session {
            Some(active) => active.clone(),
            None => {
                let fresh = self
                    .session_manager
                    .login(self.transport.clone(), credentials)
                    .await?;
                *session = Some(fresh.clone());
                fresh
            }
        };

        for zone in &self.zones {
            let stations = self.stations.get_stations(&active, *zone).await?;
            for station in &stations {
                debug!(
                    self.logger,
                    "{} at {}: wind {} {}",
                    station.name,
                    station.observed_at,
                    station.wind.direction.as_deref().unwrap_or("-"),
                    station.wind.speed;
                    "zone" => %zone
                );
            }

            let forecasts = self.forecasts.get_forecasts(&active, *zone).await?;
            for forecast in &forecasts {
                debug!(
                    self.logger,
                    "{}: day {:?}, night {:?}",
                    forecast.zone_name,
                    forecast.day.as_ref().map(|p| p.temperature),
                    forecast.night.as_ref().map(|p| p.temperature);
                    "zone" => %zone
                );
            }

            info!(
                self.logger,
                "zone done: {} stations, {} forecast areas",
                stations.len(),
                forecasts.len();
                "zone" => %zone
            );
        }
        Ok(())
    }
}
