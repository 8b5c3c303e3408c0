#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use crate::config::SchedulerConfig;
    use crate::error::{ConfigError, CpuId, SchedulerError};
    use crate::harness::Harness;
    use crate::policy::{Policy, PolicyKind, Quantum};
    use crate::process::{Pid, Process, ProcessRef, ProcessState};
    use crate::runner::Scheduler;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Dispatch(CpuId, Option<Pid>, Quantum),
        ForcePreempt(CpuId),
    }

    /// Harness that records every callback.
    #[derive(Default)]
    struct RecordingHarness {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingHarness {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn forced(&self) -> Vec<CpuId> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::ForcePreempt(cpu) => Some(cpu),
                    _ => None,
                })
                .collect()
        }
    }

    impl Harness for RecordingHarness {
        fn dispatch(&self, cpu: CpuId, process: Option<ProcessRef>, quantum: Quantum) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Dispatch(cpu, process.map(|p| p.pid()), quantum));
        }

        fn force_preempt(&self, cpu: CpuId) {
            self.calls.lock().unwrap().push(Call::ForcePreempt(cpu));
        }
    }

    fn scheduler(policy: Policy, cpus: usize) -> (Arc<Scheduler>, Arc<RecordingHarness>) {
        let harness = Arc::new(RecordingHarness::default());
        let sched = Scheduler::with_policy(policy, cpus, harness.clone()).unwrap();
        (Arc::new(sched), harness)
    }

    fn proc(pid: u32, remaining: u32) -> ProcessRef {
        Process::shared(Pid(pid), format!("p{}", pid), remaining)
    }

    fn pid_of(p: Option<ProcessRef>) -> Option<Pid> {
        p.map(|p| p.pid())
    }

    #[test]
    fn construction_validates_config() {
        let harness: Arc<dyn Harness> = Arc::new(RecordingHarness::default());
        let bad = SchedulerConfig::new(0, PolicyKind::Fifo, None);
        assert!(matches!(
            Scheduler::new(&bad, harness.clone()),
            Err(ConfigError::ZeroCpus)
        ));

        let rr = SchedulerConfig::new(2, PolicyKind::RoundRobin, Some(3));
        let sched = Scheduler::new(&rr, harness).unwrap();
        assert_eq!(sched.cpu_count(), 2);
        assert_eq!(
            sched.policy(),
            Policy::RoundRobin { timeslice: NonZeroU32::new(3).unwrap() }
        );
    }

    #[test]
    fn idle_dispatches_woken_process() {
        let (sched, harness) = scheduler(Policy::Fifo, 1);
        sched.wake_up(proc(1, 5)).unwrap();

        let got = sched.idle(0).unwrap().unwrap();
        assert_eq!(got.pid(), Pid(1));
        assert_eq!(got.state(), ProcessState::Running);
        assert_eq!(pid_of(sched.current(0).unwrap()), Some(Pid(1)));
        assert_eq!(
            harness.calls(),
            vec![Call::Dispatch(0, Some(Pid(1)), Quantum::Unbounded)]
        );
    }

    #[test]
    fn fifo_dispatch_order() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        for pid in [1, 2, 3] {
            sched.wake_up(proc(pid, 1)).unwrap();
        }
        assert_eq!(pid_of(sched.idle(0).unwrap()), Some(Pid(1)));
        assert_eq!(pid_of(sched.terminate(0).unwrap()), Some(Pid(2)));
        assert_eq!(pid_of(sched.terminate(0).unwrap()), Some(Pid(3)));
        assert_eq!(pid_of(sched.terminate(0).unwrap()), None);
        assert!(sched.current(0).unwrap().is_none());
    }

    #[test]
    fn round_robin_passes_timeslice_and_requeues_at_tail() {
        let slice = NonZeroU32::new(2).unwrap();
        let (sched, harness) = scheduler(Policy::RoundRobin { timeslice: slice }, 1);
        let a = proc(1, 10);
        sched.wake_up(a.clone()).unwrap();
        sched.wake_up(proc(2, 10)).unwrap();

        assert_eq!(pid_of(sched.idle(0).unwrap()), Some(Pid(1)));
        assert_eq!(pid_of(sched.preempt(0).unwrap()), Some(Pid(2)));
        assert_eq!(a.state(), ProcessState::Ready);
        assert_eq!(sched.ready_pids(), vec![Pid(1)]);
        assert_eq!(pid_of(sched.preempt(0).unwrap()), Some(Pid(1)));

        assert!(harness
            .calls()
            .iter()
            .all(|c| matches!(c, Call::Dispatch(_, _, Quantum::Ticks(n)) if *n == slice)));
    }

    #[test]
    fn lrtf_picks_longest_remaining() {
        let (sched, _) = scheduler(Policy::Lrtf, 1);
        // keep the cpu busy so wake-ups only queue
        sched.wake_up(proc(100, 50)).unwrap();
        sched.idle(0).unwrap();

        for (pid, t) in [(1, 5), (2, 9), (3, 3)] {
            sched.wake_up(proc(pid, t)).unwrap();
        }
        assert_eq!(pid_of(sched.terminate(0).unwrap()), Some(Pid(2)));
        assert_eq!(pid_of(sched.terminate(0).unwrap()), Some(Pid(1)));
        assert_eq!(pid_of(sched.terminate(0).unwrap()), Some(Pid(3)));
    }

    #[test]
    fn yield_marks_waiting_and_does_not_requeue() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        let p = proc(1, 4);
        sched.wake_up(p.clone()).unwrap();
        sched.idle(0).unwrap();

        assert_eq!(pid_of(sched.yield_cpu(0).unwrap()), None);
        assert_eq!(p.state(), ProcessState::Waiting);
        assert_eq!(sched.ready_len(), 0);

        // I/O completes
        sched.wake_up(p.clone()).unwrap();
        assert_eq!(p.state(), ProcessState::Ready);
        assert_eq!(pid_of(sched.idle(0).unwrap()), Some(Pid(1)));
    }

    #[test]
    fn terminate_marks_terminated() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        let p = proc(1, 0);
        sched.wake_up(p.clone()).unwrap();
        sched.idle(0).unwrap();
        sched.terminate(0).unwrap();
        assert_eq!(p.state(), ProcessState::Terminated);
        assert_eq!(sched.ready_len(), 0);
        assert_eq!(sched.metrics().terminations, 1);
    }

    #[test]
    fn events_on_idle_cpu_are_invariant_violations() {
        let (sched, _) = scheduler(Policy::Fifo, 2);
        assert_eq!(sched.preempt(1).unwrap_err(), SchedulerError::NoCurrentProcess(1));
        assert_eq!(sched.yield_cpu(0).unwrap_err(), SchedulerError::NoCurrentProcess(0));
        assert_eq!(sched.terminate(0).unwrap_err(), SchedulerError::NoCurrentProcess(0));
    }

    #[test]
    fn unknown_cpu_rejected() {
        let (sched, _) = scheduler(Policy::Fifo, 2);
        let err = SchedulerError::UnknownCpu { cpu: 2, cpu_count: 2 };
        assert_eq!(sched.idle(2).unwrap_err(), err);
        assert_eq!(sched.preempt(2).unwrap_err(), err);
    }

    #[test]
    fn double_wake_up_rejected() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        let p = proc(1, 3);
        sched.wake_up(p.clone()).unwrap();
        assert_eq!(sched.wake_up(p.clone()), Err(SchedulerError::AlreadyQueued(Pid(1))));

        sched.idle(0).unwrap();
        assert_eq!(
            sched.wake_up(p),
            Err(SchedulerError::AlreadyDispatched { pid: Pid(1), cpu: 0 })
        );
    }

    #[test]
    fn idle_blocks_until_wake_up() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        let idler = {
            let sched = Arc::clone(&sched);
            thread::spawn(move || sched.idle(0))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!idler.is_finished());

        sched.wake_up(proc(7, 2)).unwrap();
        let got = idler.join().unwrap().unwrap();
        assert_eq!(pid_of(got), Some(Pid(7)));
    }

    #[test]
    fn one_wake_up_feeds_exactly_one_idle_cpu() {
        let (sched, _) = scheduler(Policy::Fifo, 3);
        let idlers: Vec<_> = (0..3)
            .map(|cpu| {
                let sched = Arc::clone(&sched);
                thread::spawn(move || sched.idle(cpu))
            })
            .collect();
        thread::sleep(Duration::from_millis(50));

        sched.wake_up(proc(1, 2)).unwrap();
        // let the losers re-enter idle before the run ends
        thread::sleep(Duration::from_millis(50));
        sched.shutdown();

        let winners = idlers
            .into_iter()
            .filter_map(|h| h.join().unwrap().unwrap())
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn shutdown_releases_idle_cpu() {
        let (sched, harness) = scheduler(Policy::Fifo, 1);
        let idler = {
            let sched = Arc::clone(&sched);
            thread::spawn(move || sched.idle(0))
        };
        thread::sleep(Duration::from_millis(50));
        sched.shutdown();
        assert!(idler.join().unwrap().unwrap().is_none());
        assert!(sched.is_shutdown());
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn idle_after_shutdown_leaves_queued_work_alone() {
        let (sched, harness) = scheduler(Policy::Fifo, 1);
        sched.wake_up(proc(1, 2)).unwrap();
        sched.shutdown();
        assert!(sched.idle(0).unwrap().is_none());
        assert_eq!(sched.ready_pids(), vec![Pid(1)]);
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn lrtf_no_preemption_while_a_cpu_is_idle() {
        let (sched, harness) = scheduler(Policy::Lrtf, 2);
        sched.wake_up(proc(1, 1)).unwrap();
        sched.idle(0).unwrap();

        // cpu 1 idle, cpu 0 runs a 1-tick process
        assert_eq!(sched.wake_up(proc(2, 100)).unwrap(), None);
        assert!(harness.forced().is_empty());
    }

    #[test]
    fn lrtf_preempts_cpu_with_least_remaining() {
        let (sched, harness) = scheduler(Policy::Lrtf, 2);
        sched.wake_up(proc(1, 6)).unwrap();
        sched.wake_up(proc(2, 4)).unwrap();
        assert_eq!(pid_of(sched.idle(0).unwrap()), Some(Pid(1)));
        assert_eq!(pid_of(sched.idle(1).unwrap()), Some(Pid(2)));

        assert_eq!(sched.wake_up(proc(3, 10)).unwrap(), Some(1));
        assert_eq!(harness.forced(), vec![1]);
        assert_eq!(sched.metrics().forced_preemptions, 1);

        // harness delivers the preempt; cpu 1 now runs the woken process
        assert_eq!(pid_of(sched.preempt(1).unwrap()), Some(Pid(3)));
        assert_eq!(sched.ready_pids(), vec![Pid(2)]);
    }

    #[test]
    fn lrtf_preempt_keeps_strictly_longest_on_cpu() {
        let (sched, harness) = scheduler(Policy::Lrtf, 1);
        let long = proc(1, 9);
        sched.wake_up(long.clone()).unwrap();
        sched.idle(0).unwrap();
        sched.wake_up(proc(2, 4)).unwrap();

        assert_eq!(pid_of(sched.preempt(0).unwrap()), Some(Pid(1)));
        assert_eq!(long.state(), ProcessState::Running);
        assert_eq!(sched.ready_pids(), vec![Pid(2)]);
        assert_eq!(
            harness.calls().last(),
            Some(&Call::Dispatch(0, Some(Pid(1)), Quantum::Unbounded))
        );
    }

    #[test]
    fn handoff_replaces_slot_without_clearing_it() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        sched.wake_up(proc(1, 5)).unwrap();
        sched.wake_up(proc(2, 5)).unwrap();
        sched.wake_up(proc(3, 5)).unwrap();
        sched.idle(0).unwrap();

        sched.preempt(0).unwrap();
        assert_eq!(pid_of(sched.current(0).unwrap()), Some(Pid(2)));
        sched.yield_cpu(0).unwrap();
        assert_eq!(pid_of(sched.current(0).unwrap()), Some(Pid(3)));
        sched.terminate(0).unwrap();
        assert_eq!(pid_of(sched.current(0).unwrap()), Some(Pid(1)));
        assert!(sched.ready_pids().is_empty());
    }

    #[test]
    fn lrtf_no_preemption_when_woken_is_not_longer() {
        let (sched, harness) = scheduler(Policy::Lrtf, 2);
        sched.wake_up(proc(1, 6)).unwrap();
        sched.wake_up(proc(2, 4)).unwrap();
        sched.idle(0).unwrap();
        sched.idle(1).unwrap();

        assert_eq!(sched.wake_up(proc(3, 4)).unwrap(), None);
        assert_eq!(sched.wake_up(proc(4, 2)).unwrap(), None);
        assert!(harness.forced().is_empty());
        assert_eq!(sched.ready_len(), 2);
    }

    #[test]
    fn fifo_never_forces_preemption() {
        let (sched, harness) = scheduler(Policy::Fifo, 1);
        sched.wake_up(proc(1, 1)).unwrap();
        sched.idle(0).unwrap();
        assert_eq!(sched.wake_up(proc(2, 100)).unwrap(), None);
        assert!(harness.forced().is_empty());
    }

    #[test]
    fn metrics_track_events() {
        let (sched, _) = scheduler(Policy::Fifo, 1);
        sched.wake_up(proc(1, 3)).unwrap();
        sched.wake_up(proc(2, 3)).unwrap();
        sched.idle(0).unwrap();
        sched.preempt(0).unwrap();
        sched.yield_cpu(0).unwrap();
        sched.terminate(0).unwrap();

        let m = sched.metrics();
        assert_eq!(m.wake_ups, 2);
        assert_eq!(m.context_switches, 3);
        assert_eq!(m.preemptions, 1);
        assert_eq!(m.yields, 1);
        assert_eq!(m.terminations, 1);
        assert_eq!(m.idle_dispatches, 1);
    }
}
