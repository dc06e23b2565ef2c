use async_trait::async_trait;

use crate::{
    crawler::{CompanyList, DailyPriceSource},
    database::Store,
    error::SyncError,
    logging,
    scheduler::DailyTask,
};

/// 上市公司清單
pub mod company_info;
/// 日股價
pub mod daily_price;

use company_info::{CompanyRegistry, SyncOutcome};

/// 每日更新：確認資料表、同步上市公司清單，再逐一更新日股價
pub struct DailyUpdate<S, L, P> {
    store: S,
    registry: CompanyRegistry<L>,
    prices: P,
    pages_to_fetch: u32,
}

impl<S, L, P> DailyUpdate<S, L, P>
where
    S: Store,
    L: CompanyList,
    P: DailyPriceSource,
{
    pub fn new(store: S, list: L, prices: P, pages_to_fetch: u32) -> Self {
        DailyUpdate {
            store,
            registry: CompanyRegistry::new(list),
            prices,
            pages_to_fetch,
        }
    }
}

#[async_trait]
impl<S, L, P> DailyTask for DailyUpdate<S, L, P>
where
    S: Store,
    L: CompanyList,
    P: DailyPriceSource,
{
    async fn run(&mut self) -> Result<(), SyncError> {
        self.store.ensure_schema().await?;

        match self.registry.sync(&self.store).await? {
            SyncOutcome::Fresh => logging::info_file_async(format!(
                "company_info is up to date ({} companies)",
                self.registry.lookup().len()
            )),
            SyncOutcome::Refreshed(count) => logging::info_file_async(format!(
                "company_info is refreshed ({} written, {} companies)",
                count,
                self.registry.lookup().len()
            )),
            SyncOutcome::RefreshFailed(_) => logging::warn_file_async(format!(
                "Update daily prices with the stored company list ({} companies)",
                self.registry.lookup().len()
            )),
        }

        daily_price::execute(
            &self.store,
            &self.prices,
            self.registry.lookup(),
            self.pages_to_fetch,
        )
        .await?;

        Ok(())
    }
}
