mod common;

use std::collections::BTreeSet;

use shongo_scheduler::config::SchedulerConfig;
use shongo_scheduler::domain::cache::cache::Cache;
use shongo_scheduler::domain::reservation::available_reservation::AvailableReservationType;
use shongo_scheduler::domain::reservation::reservation::{Reservation, ReservationKind};
use shongo_scheduler::domain::reservation::reservation_store::ReservationId;
use shongo_scheduler::domain::scheduler::context::SchedulerContext;
use shongo_scheduler::domain::scheduler::persistence::InMemoryPersistence;
use shongo_scheduler::domain::utils::id::ResourceId;

use common::interval;

fn plain(cache: &mut Cache) -> ReservationId {
    cache.add_reservation(Reservation::new(interval(0, 100), ReservationKind::Plain))
}

fn set<T: Ord + Clone>(items: &[T]) -> BTreeSet<T> {
    items.iter().cloned().collect()
}

fn available(context: &SchedulerContext<'_>) -> BTreeSet<ReservationId> {
    context.get_state().get_available_reservations().into_iter().map(|available| available.original).collect()
}

#[test]
fn test_savepoint_revert_restores_state() {
    common::init();
    let mut cache = Cache::new();
    let persistence = InMemoryPersistence::new();
    let config = SchedulerConfig::default();

    let resource1 = ResourceId::new("resource1");
    let resource2 = ResourceId::new("resource2");
    let resource3 = ResourceId::new("resource3");
    let allocated1 = plain(&mut cache);
    let allocated2 = plain(&mut cache);
    let allocated3 = plain(&mut cache);
    let reusable1 = plain(&mut cache);
    let reusable2 = plain(&mut cache);
    let reusable3 = plain(&mut cache);
    let allocated_parents = [plain(&mut cache), plain(&mut cache), plain(&mut cache)];
    let reusable_parents = [plain(&mut cache), plain(&mut cache), plain(&mut cache)];
    for (parent, child) in allocated_parents.iter().zip([allocated1, allocated2, allocated3]) {
        cache.reservations_mut().add_child(*parent, child).unwrap();
    }
    for (parent, child) in reusable_parents.iter().zip([reusable1, reusable2, reusable3]) {
        cache.reservations_mut().add_child(*parent, child).unwrap();
    }

    let mut context = SchedulerContext::new(&mut cache, &persistence, &config, 0);
    context.get_state_mut().add_referenced_resource(resource1.clone()).unwrap();
    context.add_allocated_reservation(allocated1).unwrap();
    context.add_available_reservation(reusable1, AvailableReservationType::Reusable).unwrap();

    // Additions in two nested savepoints.
    let savepoint1 = context.create_savepoint();
    context.get_state_mut().add_referenced_resource(resource2.clone()).unwrap();
    context.add_allocated_reservation(allocated2).unwrap();
    context.add_available_reservation(reusable2, AvailableReservationType::Reusable).unwrap();
    assert_eq!(context.get_current_savepoint(), Some(savepoint1));

    let savepoint2 = context.create_savepoint();
    context.get_state_mut().add_referenced_resource(resource3.clone()).unwrap();
    context.add_allocated_reservation(allocated3).unwrap();
    context.add_available_reservation(reusable3, AvailableReservationType::Reusable).unwrap();
    assert_eq!(context.get_current_savepoint(), Some(savepoint2));

    assert_eq!(context.get_state().get_referenced_resources(), &set(&[resource1.clone(), resource2.clone(), resource3.clone()]));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1, allocated2, allocated3]));
    assert_eq!(available(&context), set(&[reusable1, reusable2, reusable3]));

    context.revert(savepoint2).unwrap();
    assert_eq!(context.get_current_savepoint(), Some(savepoint1));
    assert_eq!(context.get_state().get_referenced_resources(), &set(&[resource1.clone(), resource2.clone()]));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1, allocated2]));
    assert_eq!(available(&context), set(&[reusable1, reusable2]));

    context.revert(savepoint1).unwrap();
    assert_eq!(context.get_current_savepoint(), None);
    assert_eq!(context.get_state().get_referenced_resources(), &set(&[resource1.clone()]));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1]));
    assert_eq!(available(&context), set(&[reusable1]));

    // Removals inside a savepoint are restored by its revert.
    let savepoint1 = context.create_savepoint();
    context.get_state_mut().add_referenced_resource(resource2.clone()).unwrap();
    context.get_state_mut().add_referenced_resource(resource3.clone()).unwrap();
    context.add_allocated_reservation(allocated2).unwrap();
    context.add_allocated_reservation(allocated3).unwrap();
    context.add_available_reservation(reusable2, AvailableReservationType::Reusable).unwrap();
    context.add_available_reservation(reusable3, AvailableReservationType::Reusable).unwrap();

    let savepoint2 = context.create_savepoint();
    context.get_state_mut().remove_referenced_resource(&resource2).unwrap();
    context.remove_allocated_reservation(allocated2).unwrap();
    context.remove_available_reservation(reusable2).unwrap();
    assert_eq!(context.get_state().get_referenced_resources(), &set(&[resource1.clone(), resource3.clone()]));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1, allocated3]));
    assert_eq!(available(&context), set(&[reusable1, reusable3]));

    context.revert(savepoint2).unwrap();
    assert_eq!(context.get_current_savepoint(), Some(savepoint1));
    assert_eq!(context.get_state().get_referenced_resources(), &set(&[resource1.clone(), resource2.clone(), resource3.clone()]));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1, allocated2, allocated3]));
    assert_eq!(available(&context), set(&[reusable1, reusable2, reusable3]));

    context.revert(savepoint1).unwrap();
    assert_eq!(context.get_state().get_referenced_resources(), &set(&[resource1.clone()]));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1]));
    assert_eq!(available(&context), set(&[reusable1]));

    // Parents wrapping reservations which are already in the state.
    let savepoint1 = context.create_savepoint();
    context.add_allocated_reservation(allocated2).unwrap();
    context.add_allocated_reservation(allocated3).unwrap();
    context.add_available_reservation(reusable2, AvailableReservationType::Reusable).unwrap();
    context.add_available_reservation(reusable3, AvailableReservationType::Reusable).unwrap();

    let savepoint2 = context.create_savepoint();
    for parent in allocated_parents {
        context.add_allocated_reservation(parent).unwrap();
    }
    for parent in reusable_parents {
        context.add_available_reservation(parent, AvailableReservationType::Reusable).unwrap();
    }
    let mut all_allocated = set(&[allocated1, allocated2, allocated3]);
    all_allocated.extend(allocated_parents);
    let mut all_available = set(&[reusable1, reusable2, reusable3]);
    all_available.extend(reusable_parents);
    assert_eq!(context.get_state().get_allocated_reservations(), all_allocated);
    assert_eq!(available(&context), all_available);

    context.revert(savepoint2).unwrap();
    assert_eq!(context.get_current_savepoint(), Some(savepoint1));
    assert_eq!(context.get_state().get_allocated_reservations(), set(&[allocated1, allocated2, allocated3]), "Children must survive the revert of their parents.");
    assert_eq!(available(&context), set(&[reusable1, reusable2, reusable3]), "Children must survive the revert of their parents.");
}

#[test]
fn test_destroyed_savepoint_keeps_changes() {
    common::init();
    let mut cache = Cache::new();
    let persistence = InMemoryPersistence::new();
    let config = SchedulerConfig::default();
    let reservation = plain(&mut cache);

    let mut context = SchedulerContext::new(&mut cache, &persistence, &config, 0);
    let outer = context.create_savepoint();
    let inner = context.create_savepoint();
    context.add_allocated_reservation(reservation).unwrap();
    context.destroy(inner);
    assert_eq!(context.get_current_savepoint(), Some(outer));
    assert!(context.get_state().contains_allocated_reservation(reservation));

    context.revert(outer).unwrap();
    assert!(!context.get_state().contains_allocated_reservation(reservation), "Changes of a destroyed savepoint belong to the enclosing one.");
    assert!(context.revert(inner).is_err(), "Reverting a savepoint which is no longer active must fail.");
}

#[test]
fn test_discard_drops_created_reservations() {
    common::init();
    let mut cache = Cache::new();
    let persistence = InMemoryPersistence::new();
    let config = SchedulerConfig::default();

    let (kept, dropped) = {
        let mut context = SchedulerContext::new(&mut cache, &persistence, &config, 0);
        let kept = context.create_reservation(Reservation::new(interval(0, 10), ReservationKind::Plain));
        let dropped = context.create_reservation(Reservation::new(interval(0, 10), ReservationKind::Plain));
        context.finish(&[kept]);
        (kept, dropped)
    };
    assert!(cache.reservations().contains(kept));
    assert!(!cache.reservations().contains(dropped), "Created reservations outside the allocated trees are removed.");

    let created = {
        let mut context = SchedulerContext::new(&mut cache, &persistence, &config, 0);
        let created = context.create_reservation(Reservation::new(interval(0, 10), ReservationKind::Plain));
        context.discard();
        created
    };
    assert!(!cache.reservations().contains(created));
    assert!(cache.reservations().contains(kept));
}
