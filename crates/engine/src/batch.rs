//! 배치 번역
//!
//! 요청마다 독립 태스크를 띄우고 `worker_pool_size` 크기의 세마포어로 동시 실행 수를
//! 제한합니다. 한 요청의 실패나 패닉은 다른 요청에 영향을 주지 않습니다.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use udfbridge_core::error::TranslationError;
use udfbridge_core::metrics as m;

use crate::orchestrator::TranslationOrchestrator;
use crate::request::{BatchItem, BatchRequest, BatchResult};

impl TranslationOrchestrator {
    /// 요청 목록을 동시에 번역합니다.
    ///
    /// 결과는 제출 순서대로 반환되며 각 항목은 `request_id`로 원 요청을 추적합니다.
    pub async fn translate_batch(&self, requests: Vec<BatchRequest>) -> BatchResult {
        let total = requests.len();
        metrics::histogram!(m::BATCH_SIZE).record(total as f64);

        let workers = self.inner.config.engine.worker_pool_size.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let defaults = self.default_options();

        let mut handles = Vec::with_capacity(total);
        for request in requests {
            let request_id = if request.request_id.trim().is_empty() {
                format!("req-{}", Uuid::new_v4())
            } else {
                request.request_id.clone()
            };
            let options = request.options.resolve(&defaults);
            let orchestrator = self.clone();
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return Err(TranslationError::Internal(format!(
                            "worker pool closed: {e}"
                        )));
                    }
                };
                orchestrator
                    .translate(
                        &request.content,
                        &request.source_platform,
                        &request.target_platform,
                        options,
                    )
                    .await
            });
            handles.push((request_id, handle));
        }

        let mut items = Vec::with_capacity(total);
        for (request_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(request_id = %request_id, error = %e, "batch worker failed");
                    Err(TranslationError::Internal(format!("batch worker failed: {e}")))
                }
            };
            items.push(BatchItem {
                request_id,
                outcome,
            });
        }

        let result = BatchResult::from_items(items);
        info!(
            total,
            success = result.success_count,
            failure = result.failure_count,
            workers,
            "batch translation completed"
        );
        result
    }
}
