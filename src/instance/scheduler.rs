// Thu Jan 16 2026 - Alex

use super::{ClassKind, DataModel, ModelError, RenderView, Session, VisualEngine};
use crate::memory::accessor::RECORD_STRIDE;
use crate::memory::Address;
use crate::offsets::names;
use std::sync::Arc;

pub const RENDER_JOB: &str = "RenderJob";

/// Entry point into the target: the job list hanging off the module base,
/// and the roots reachable from it.
pub struct TaskScheduler {
    session: Arc<Session>,
}

impl TaskScheduler {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn base_field(&self, name: &str) -> Result<Address, ModelError> {
        let base = self.session.base();
        if base.is_null() {
            return Err(ModelError::NullInstance);
        }
        Ok(base + self.session.offset(name)?)
    }

    pub fn try_jobs(&self) -> Result<Vec<Address>, ModelError> {
        let list = self.base_field(names::JOBS_POINTER)?;
        let memory = self.session.memory();
        let start = memory.try_read_ptr(list)?;
        let end = memory.try_read_ptr(list + 8)?;
        Ok(memory.read_pointer_array(start, end, RECORD_STRIDE, |job| job))
    }

    pub fn jobs(&self) -> Vec<Address> {
        self.try_jobs().unwrap_or_default()
    }

    pub fn job_name(&self, job: Address) -> String {
        match self.session.offset(names::JOB_NAME) {
            Ok(offset) if !job.is_null() => self.session.memory().read_small_string(job + offset),
            _ => String::new(),
        }
    }

    /// First job whose name contains `name`.
    pub fn job(&self, name: &str) -> Option<Address> {
        self.jobs().into_iter().find(|job| self.job_name(*job).contains(name))
    }

    pub fn render_view(&self) -> RenderView {
        let addr = self
            .job(RENDER_JOB)
            .and_then(|job| {
                let offset = self.session.offset(names::RENDER_JOB_TO_RENDER_VIEW).ok()?;
                self.session.memory().read_ptr(job + offset).non_null()
            })
            .unwrap_or_default();
        RenderView::new(self.session.instance_as(addr, ClassKind::RenderView))
    }

    pub fn visual_engine(&self) -> VisualEngine {
        self.render_view().visual_engine()
    }

    pub fn try_data_model(&self) -> Result<DataModel, ModelError> {
        let memory = self.session.memory();
        let fake = memory.try_read_ptr(self.base_field(names::FAKE_DATA_MODEL_POINTER)?)?;
        if fake.is_null() {
            return Err(ModelError::BrokenChain(names::FAKE_DATA_MODEL_POINTER.to_string()));
        }
        let addr = memory.try_read_ptr(fake + self.session.offset(names::FAKE_DATA_MODEL_TO_DATA_MODEL)?)?;
        if addr.is_null() {
            return Err(ModelError::BrokenChain(names::FAKE_DATA_MODEL_TO_DATA_MODEL.to_string()));
        }
        Ok(DataModel::new(self.session.instance(addr)))
    }

    /// Null when the game is not reachable yet.
    pub fn data_model(&self) -> DataModel {
        self.try_data_model().unwrap_or_else(|e| {
            log::trace!("data model unavailable: {}", e);
            DataModel::new(self.session.null_instance())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::fixture::TreeBuilder;
    use crate::memory::RemoteMemory;

    fn job(tree: &mut TreeBuilder, name: &str) -> Address {
        let job = tree.alloc(0x200);
        let slot = job + tree.offset("Job_Name");
        tree.write_string(slot, name);
        job
    }

    #[test]
    fn test_jobs_and_roots() {
        let mut tree = TreeBuilder::new();
        let base = tree.mock().module_base();

        let physics = job(&mut tree, "PhysicsJob");
        let render = job(&mut tree, "RenderJob(EarlyRendering;Ugc)");
        let array = tree.alloc(0x40);
        tree.poke_u64(array, physics.as_u64());
        tree.poke_u64(array + 0x10, render.as_u64());
        let jobs = base + tree.offset("JobsPointer");
        tree.poke_u64(jobs, array.as_u64());
        tree.poke_u64(jobs + 8, array.as_u64() + 0x20);

        let view = tree.alloc(0x40);
        let engine = tree.alloc(0x200);
        tree.poke_u64(render + tree.offset("RenderJobToRenderView"), view.as_u64());
        tree.poke_u64(view + tree.offset("VisualEngine"), engine.as_u64());

        let game = tree.root("DataModel", "Game");
        let fake = tree.alloc(0x200);
        tree.poke_u64(base + tree.offset("FakeDataModelPointer"), fake.as_u64());
        tree.poke_u64(fake + tree.offset("FakeDataModelToDataModel"), game.as_u64());

        let session = tree.session();
        let scheduler = session.scheduler();
        assert_eq!(scheduler.jobs(), vec![physics, render]);
        assert_eq!(scheduler.job_name(physics), "PhysicsJob");
        assert_eq!(scheduler.job(RENDER_JOB), Some(render));
        assert_eq!(scheduler.job("Nope"), None);

        assert_eq!(scheduler.render_view().address(), view);
        assert_eq!(scheduler.visual_engine().address(), engine);
        assert_eq!(scheduler.visual_engine().kind(), ClassKind::VisualEngine);

        let data_model = scheduler.data_model();
        assert_eq!(data_model.address(), game);
        assert_eq!(data_model.kind(), ClassKind::DataModel);
    }

    #[test]
    fn test_empty_scheduler() {
        let session = TreeBuilder::new().session();
        let scheduler = session.scheduler();
        assert!(scheduler.jobs().is_empty());
        assert!(scheduler.render_view().is_null());
        assert!(scheduler.visual_engine().is_null());
        assert!(scheduler.data_model().is_null());
        assert!(matches!(scheduler.try_data_model(), Err(ModelError::BrokenChain(_))));
    }
}
