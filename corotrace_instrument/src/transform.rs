use corotrace_ir::class::{ClassInfo, CompiledMethod};
use log::{debug, error};

use crate::abi::CoroutineAbi;
use crate::error::PlanError;
use crate::plan::MethodPlan;
use crate::planner::Planner;
use crate::session::InstrumentationSession;

/// Materializes a plan as real hook calls in a method body.
pub trait HookInjector {
    type Error: std::error::Error;

    fn inject(&mut self, method: &mut CompiledMethod, plan: &MethodPlan) -> Result<(), Self::Error>;
}

#[derive(Debug, Default)]
pub struct ClassReport {
    pub transformed: Vec<MethodPlan>,
    // method name + desc
    pub failed: Vec<(String, PlanError)>,
    pub skipped: bool,
}

/// Plans and injects every method of `class`. A method that fails to plan or inject is left as
/// it was and reported; the rest of the class is still processed.
pub fn transform_class<I: HookInjector>(
    session: &InstrumentationSession, abi: &dyn CoroutineAbi, class: &mut ClassInfo, injector: &mut I,
) -> ClassReport {
    let mut report = ClassReport::default();
    if abi.is_excluded(class) {
        report.skipped = true;
        return report
    }

    let planner = Planner::new(abi, session);
    let mut plans = Vec::new();
    for (i, method) in class.methods.iter().enumerate() {
        match planner.plan_method(class, method) {
            Ok(Some(plan)) => plans.push((i, plan)),
            Ok(None) => {},
            Err(e) => {
                error!("while instrumenting {}.{} with desc: {} exception: {}", class.name, method.name, method.desc, e);
                debug!("method body: {:?}", method.insns);
                report.failed.push((format!("{}{}", method.name, method.desc), e));
            },
        }
    }

    for (i, plan) in plans {
        let method = &mut class.methods[i];
        // inject into a copy so a half-done injection never leaks out
        let mut rewritten = method.clone();
        match injector.inject(&mut rewritten, &plan) {
            Ok(()) => {
                *method = rewritten;
                report.transformed.push(plan);
            },
            Err(e) => {
                error!("failed to inject hooks into {}.{}: {}", class.name, method.name, e);
            },
        }
    }

    report
}
