use std::collections::VecDeque;
use std::time::Duration;

use conto::*;
use float_cmp::approx_eq;
use itertools::Itertools;
use quickcheck_macros::quickcheck;
use rstest::{fixture, rstest};

fn at(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

fn single_agent() -> Config {
    Config {
        agent_count: 1,
        ..Config::default()
    }
}

#[fixture]
fn sampler() -> FixedSampler {
    FixedSampler::new(vec![0.0])
        .with_patience(1000.0)
        .with_menu_time(0.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0))
}

fn ids(records: &[ContactRecord]) -> Vec<usize> {
    records.iter().map(|r| usize::from(r.id)).collect()
}

#[rstest]
fn test_single_contact_lifecycle(sampler: FixedSampler) {
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    let agent = AgentId::from(0);
    let contact = ContactId::from(1);
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Available);

    assert_eq!(center.start(Some(at(50))), at(50));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Busy);
    assert_eq!(center.contact_status(contact), Some(ContactStatus::InProgress));

    center.start(Some(at(105)));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::WrapUp);
    assert_eq!(center.contact_status(contact), Some(ContactStatus::WrapUp));

    center.start(Some(at(111)));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Available);
    assert_eq!(center.agent(agent).unwrap().last_status_change(), at(110));
    assert_eq!(center.contact_status(contact), Some(ContactStatus::Completed));
    assert!(center.contact(contact).is_none());

    let record = &center.finished()[0];
    assert_eq!(record.handled_by, Some(agent));
    assert_eq!(record.hold_count, 0);
    assert_eq!(record.answer_time, Some(0.0));
    assert!(approx_eq!(f64, record.duration, 110.0));
    assert!(approx_eq!(f64, record.wait_time, 0.0));

    let stats = center.statistics();
    assert_eq!((stats.count, stats.handled, stats.abandoned), (1, 1, 0));
    assert!(approx_eq!(f64, stats.aht(), 110.0));
    assert_eq!(center.agent(agent).unwrap().statistics().handled, 1);
    assert_eq!(center.start(None), at(111));
}

#[rstest]
fn test_abandon_without_agents(sampler: FixedSampler) {
    let config = Config {
        agent_count: 0,
        ..Config::default()
    };
    let mut center = ContactCenter::with_sampler(&config, sampler.with_patience(30.0)).unwrap();
    center.start(Some(at(10)));
    assert_eq!(center.queued(), vec![ContactId::from(1)]);
    assert_eq!(
        center.contact_status(ContactId::from(1)),
        Some(ContactStatus::Queued)
    );

    assert_eq!(center.start(None), at(30));
    assert_eq!(
        center.contact_status(ContactId::from(1)),
        Some(ContactStatus::Abandoned)
    );
    assert!(center.queued().is_empty());
    let stats = center.statistics();
    assert_eq!((stats.count, stats.handled, stats.abandoned), (1, 0, 1));
    assert!(approx_eq!(f64, stats.abandonment_rate(), 1.0));
    let record = &center.finished()[0];
    assert_eq!(record.handled_by, None);
    assert!(approx_eq!(f64, record.duration, 0.0));
}

#[test]
fn test_freed_agent_takes_head_of_queue() {
    let sampler = FixedSampler::new(vec![0.0, 1.0, 1.0])
        .with_patience(1000.0)
        .with_menu_time(0.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0));
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    center.start(Some(at(50)));
    assert_eq!(center.queued(), vec![ContactId::from(2), ContactId::from(3)]);

    center.start(Some(at(111)));
    assert_eq!(
        center.contact_status(ContactId::from(1)),
        Some(ContactStatus::Completed)
    );
    assert_eq!(
        center.contact_status(ContactId::from(2)),
        Some(ContactStatus::InProgress)
    );
    assert_eq!(
        center.contact_status(ContactId::from(3)),
        Some(ContactStatus::Queued)
    );
    assert_eq!(center.queued(), vec![ContactId::from(3)]);
    assert_eq!(center.agent(AgentId::from(0)).unwrap().status(), AgentStatus::Busy);

    let second = center.contact(ContactId::from(2)).unwrap();
    assert_eq!(second.answer_time(), Some(at(110)));
    assert_eq!(second.wait_time(), at(109));
}

#[rstest]
fn test_idle_agent_does_not_wait_for_menu(sampler: FixedSampler) {
    let sampler = sampler.with_menu_time(10.0);
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    center.start(Some(at(1)));
    let contact = center.contact(ContactId::from(1)).unwrap();
    assert_eq!(contact.status(), ContactStatus::InProgress);
    assert_eq!(contact.skill(), Some(Skill::CustomerService));
    assert!(center.queued().is_empty());

    assert_eq!(center.start(None), at(110));
    let record = &center.finished()[0];
    assert_eq!(record.status, ContactStatus::Completed);
    assert_eq!(record.answer_time, Some(0.0));
    assert!(approx_eq!(f64, record.wait_time, 0.0));
    assert!(approx_eq!(f64, record.duration, 110.0));
}

#[test]
fn test_freed_agent_takes_contact_out_of_menu() {
    let sampler = FixedSampler::new(vec![0.0, 105.0])
        .with_patience(1000.0)
        .with_menu_time(20.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0));
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    let second = ContactId::from(2);
    center.start(Some(at(106)));
    assert_eq!(center.queued(), vec![second]);
    let contact = center.contact(second).unwrap();
    assert_eq!(contact.status(), ContactStatus::Arrival);
    assert_eq!(contact.skill(), None);

    center.start(Some(at(111)));
    assert!(center.queued().is_empty());
    let contact = center.contact(second).unwrap();
    assert_eq!(contact.status(), ContactStatus::InProgress);
    assert_eq!(contact.answer_time(), Some(at(110)));
    assert_eq!(contact.wait_time(), at(5));
    assert_eq!(contact.skill(), Some(Skill::CustomerService));

    center.start(Some(at(130)));
    assert_eq!(center.contact_status(second), Some(ContactStatus::InProgress));
    assert_eq!(center.start(None), at(220));
    assert_eq!(ids(center.finished()), vec![1, 2]);
}

#[rstest(patience, case(5), case(10))]
fn test_patience_runs_out_during_menu(sampler: FixedSampler, patience: u64) {
    let sampler = sampler
        .with_patience(patience as f64)
        .with_menu_time(10.0);
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    let agent = AgentId::from(0);
    let contact = ContactId::from(1);
    center.set_agent_status(agent, AgentStatus::NotAvailable).unwrap();

    assert_eq!(center.start(Some(at(patience + 1))), at(patience + 1));
    assert_eq!(center.contact_status(contact), Some(ContactStatus::Abandoned));
    assert!(center.queued().is_empty());
    let record = &center.finished()[0];
    assert_eq!(record.skill, None);
    assert_eq!(record.handled_by, None);
    assert_eq!(record.answer_time, None);

    center.set_agent_status(agent, AgentStatus::Available).unwrap();
    center.start(None);
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Available);
    assert_eq!(center.agent(agent).unwrap().statistics().handled, 0);
    assert_eq!(center.finished().len(), 1);
    let stats = center.statistics();
    assert_eq!((stats.count, stats.handled, stats.abandoned), (1, 0, 1));
}

#[test]
fn test_busy_agent_keeps_contact() {
    let sampler = FixedSampler::new(vec![0.0, 1.0])
        .with_patience(1000.0)
        .with_menu_time(0.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0));
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    let agent = AgentId::from(0);
    center.start(Some(at(20)));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Busy);

    for status in &[AgentStatus::Offline, AgentStatus::Available] {
        assert!(matches!(
            center.set_agent_status(agent, *status),
            Err(Error::StatusChangeRefused {
                from: AgentStatus::Busy,
                ..
            })
        ));
    }
    center.start(Some(at(30)));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Busy);
    assert_eq!(center.agent(agent).unwrap().last_status_change(), at(0));
    let first = center.contact(ContactId::from(1)).unwrap();
    assert_eq!(first.status(), ContactStatus::InProgress);
    assert_eq!(first.handled_by(), Some(agent));
    assert_eq!(
        center.contact_status(ContactId::from(2)),
        Some(ContactStatus::Queued)
    );
    assert_eq!(center.queued(), vec![ContactId::from(2)]);

    assert_eq!(center.start(None), at(220));
    let answered: Vec<_> = center
        .finished()
        .iter()
        .filter_map(|r| r.answer_time)
        .collect();
    assert_eq!(answered, vec![0.0, 110.0]);
}

#[rstest(
    contact_type,
    hold_count,
    end,
    case(ContactType::Call, 1, 130),
    case(ContactType::Chat, 0, 110),
    case(ContactType::Email, 0, 110)
)]
fn test_hold_accounting(contact_type: ContactType, hold_count: usize, end: u64) {
    let sampler = FixedSampler::new(vec![0.0])
        .with_menu_time(0.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0).with_hold(20.0, 15.0));
    let config = Config {
        contact_type,
        ..single_agent()
    };
    let mut center = ContactCenter::with_sampler(&config, sampler).unwrap();
    center.start(Some(at(30)));
    let contact = center.contact(ContactId::from(1)).unwrap();
    assert_eq!(contact.status(), ContactStatus::InProgress);
    assert_eq!(contact.hold_count(), hold_count);

    assert_eq!(center.start(None), at(end));
    let record = &center.finished()[0];
    assert_eq!(record.hold_count, hold_count);
    assert!(approx_eq!(f64, record.hold_duration, 15.0 * hold_count as f64));
    assert!(approx_eq!(f64, record.duration, end as f64));
    assert_eq!(center.statistics().hold_count, hold_count);
    assert_eq!(
        center.agent(AgentId::from(0)).unwrap().statistics().hold_count,
        hold_count
    );
}

#[rstest]
fn test_proficiency_scales_calls(sampler: FixedSampler) {
    let config = Config {
        proficiency: 2.0,
        ..single_agent()
    };
    let mut center = ContactCenter::with_sampler(&config, sampler).unwrap();
    assert_eq!(center.start(None), at(210));
    assert!(approx_eq!(f64, center.finished()[0].duration, 210.0));
}

/// Fixed timings, except for patience, which is scripted per contact.
struct ScriptedPatience {
    patience: VecDeque<f64>,
    fixed: FixedSampler,
}

impl Sampler for ScriptedPatience {
    fn interarrival(&mut self) -> Option<f64> {
        self.fixed.interarrival()
    }

    fn patience(&mut self) -> f64 {
        self.patience.pop_front().unwrap_or(1000.0)
    }

    fn menu_time(&mut self) -> f64 {
        self.fixed.menu_time()
    }

    fn skill(&mut self, skills: &[Skill]) -> Option<Skill> {
        self.fixed.skill(skills)
    }

    fn handling(&mut self) -> HandlingPlan {
        self.fixed.handling()
    }
}

#[test]
fn test_queue_stays_fifo_despite_abandonment() {
    let sampler = ScriptedPatience {
        patience: vec![1000.0, 1000.0, 20.0, 1000.0, 1000.0].into(),
        fixed: FixedSampler::new(vec![0.0, 1.0, 1.0, 1.0, 1.0])
            .with_menu_time(0.0)
            .with_plan(HandlingPlan::fixed(100.0, 10.0)),
    };
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    center.start(Some(at(10)));
    assert_eq!(
        center.queued(),
        (2..=5).map(ContactId::from).collect::<Vec<_>>()
    );

    center.start(Some(at(30)));
    assert_eq!(
        center.queued(),
        vec![ContactId::from(2), ContactId::from(4), ContactId::from(5)]
    );

    assert_eq!(center.start(None), at(440));
    assert_eq!(ids(center.finished()), vec![3, 1, 2, 4, 5]);
    let answered: Vec<_> = center
        .finished()
        .iter()
        .filter_map(|r| r.answer_time)
        .collect();
    assert_eq!(answered, vec![0.0, 110.0, 220.0, 330.0]);
    assert_eq!(center.statistics().abandoned, 1);
}

#[test]
fn test_longest_idle_agent_is_selected() {
    let sampler = FixedSampler::new(vec![0.0, 5.0, 200.0, 0.0])
        .with_menu_time(0.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0));
    let config = Config {
        agent_count: 2,
        ..Config::default()
    };
    let mut center = ContactCenter::with_sampler(&config, sampler).unwrap();
    center.start(None);
    let handled_by: Vec<_> = center
        .finished()
        .iter()
        .sorted_by_key(|r| r.id)
        .map(|r| r.handled_by.map(usize::from))
        .collect();
    assert_eq!(handled_by, vec![Some(0), Some(1), Some(0), Some(1)]);
}

#[rstest]
fn test_offline_agent_skips_wrap_up(sampler: FixedSampler) {
    let sampler = sampler.with_plan(HandlingPlan::fixed(100.0, 50.0));
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    let agent = AgentId::from(0);
    center.start(Some(at(105)));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::WrapUp);

    center.set_agent_status(agent, AgentStatus::Offline).unwrap();
    assert_eq!(center.start(None), at(150));
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Offline);
    assert_eq!(center.agent(agent).unwrap().last_status_change(), at(105));
    assert_eq!(
        center.contact_status(ContactId::from(1)),
        Some(ContactStatus::Completed)
    );
    assert_eq!(center.agent(agent).unwrap().statistics().handled, 1);
}

#[test]
fn test_agent_made_available_takes_queued_contact() {
    let sampler = FixedSampler::new(vec![0.0, 1.0])
        .with_patience(1000.0)
        .with_menu_time(0.0)
        .with_plan(HandlingPlan::fixed(100.0, 10.0));
    let mut center = ContactCenter::with_sampler(&single_agent(), sampler).unwrap();
    let agent = AgentId::from(0);
    center.assign_agent_status(agent, "not_available").unwrap();
    center.start(Some(at(10)));
    assert_eq!(center.queued(), vec![ContactId::from(1), ContactId::from(2)]);

    center.assign_agent_status(agent, "available").unwrap();
    center.start(Some(at(20)));
    assert_eq!(center.queued(), vec![ContactId::from(2)]);
    assert_eq!(center.agent(agent).unwrap().status(), AgentStatus::Busy);
    let first = center.contact(ContactId::from(1)).unwrap();
    assert_eq!(first.status(), ContactStatus::InProgress);
    assert_eq!(first.answer_time(), Some(at(10)));
}

fn random_center(seed: u64) -> ContactCenter {
    let config = Config {
        agent_count: 3,
        contact_rate: 1.0 / 60.0,
        handle_time: 200.0,
        hold_probability: 0.5,
        abandon_time: 60.0,
        seed,
        ..Config::default()
    };
    ContactCenter::new(&config).unwrap()
}

#[test]
fn test_same_seed_same_run() {
    let mut first = random_center(7);
    let mut second = random_center(7);
    first.start(Some(at(20_000)));
    second.start(Some(at(20_000)));
    assert!(first.statistics().count > 0);
    assert_eq!(first.statistics(), second.statistics());
    assert_eq!(first.finished(), second.finished());
}

#[quickcheck]
fn contacts_end_in_a_terminal_state(seed: u64) -> bool {
    let mut center = random_center(seed);
    center.start(Some(at(5000)));
    let stats = center.statistics();
    let finished = center.finished();
    let queued = center.queued();
    let busy = center
        .agents()
        .iter()
        .filter(|a| a.status() != AgentStatus::Available)
        .count();
    let in_service = (1..)
        .map(ContactId::from)
        .take_while(|&id| center.contact_status(id).is_some())
        .filter(|&id| {
            matches!(
                center.contact_status(id),
                Some(ContactStatus::InProgress) | Some(ContactStatus::WrapUp)
            )
        })
        .count();
    finished.iter().all(|r| r.status.is_terminal())
        && stats.count == finished.len()
        && stats.handled + stats.abandoned == stats.count
        && finished
            .iter()
            .filter(|r| r.status == ContactStatus::Completed)
            .all(|r| r.handled_by.is_some() && r.duration >= r.wait_time)
        && queued.iter().all(|&id| {
            matches!(
                center.contact_status(id),
                Some(ContactStatus::Arrival) | Some(ContactStatus::Queued)
            )
        })
        && in_service <= busy
}

#[quickcheck]
fn contact_log_lists_every_finished_contact(seed: u64) -> bool {
    let mut center = random_center(seed);
    center.start(Some(at(3000)));
    let mut buf = Vec::new();
    center.write_contacts(&mut buf).unwrap();
    let csv = String::from_utf8(buf).unwrap();
    csv.lines().count() == center.finished().len() + 1
}
