use super::*;
use crate::state::Session;
use crate::state::test_helpers::seed_player;

#[test]
fn strict_majority_wins() {
    let mut session = Session::new(3);
    let p1 = seed_player(&mut session, "Keen Lynx", true);
    let p2 = seed_player(&mut session, "Sly Raven", false);

    let mut board = vec![None; 9];
    for cell in board.iter_mut().take(5) {
        *cell = Some(p1.id);
    }
    for cell in board.iter_mut().skip(5).take(4) {
        *cell = Some(p2.id);
    }

    assert_eq!(resolve(&board, &session.players), Some(p1));
}

#[test]
fn tie_has_no_winner() {
    let mut session = Session::new(2);
    let p1 = seed_player(&mut session, "Keen Lynx", true);
    let p2 = seed_player(&mut session, "Sly Raven", false);

    let board = vec![Some(p1.id), Some(p2.id), Some(p1.id), Some(p2.id)];
    assert!(resolve(&board, &session.players).is_none());
}

#[test]
fn all_unclaimed_board_has_no_winner() {
    let board: Vec<Option<Uuid>> = vec![None; 9];
    assert!(resolve(&board, &[]).is_none());
}

#[test]
fn unknown_claimant_has_no_winner() {
    let mut session = Session::new(2);
    seed_player(&mut session, "Keen Lynx", true);

    // The engine never validates claim ids, so a board can be dominated
    // by an id with no roster entry.
    let stranger = Uuid::new_v4();
    let board = vec![Some(stranger), Some(stranger), None, None];

    assert!(resolve(&board, &session.players).is_none());
}

#[test]
fn resolution_is_deterministic() {
    let mut session = Session::new(3);
    let p1 = seed_player(&mut session, "Keen Lynx", true);
    let p2 = seed_player(&mut session, "Sly Raven", false);

    let board = vec![
        Some(p1.id),
        Some(p1.id),
        Some(p2.id),
        None,
        Some(p1.id),
        None,
        Some(p2.id),
        None,
        None,
    ];

    let first = resolve(&board, &session.players);
    for _ in 0..10 {
        assert_eq!(resolve(&board, &session.players), first);
    }
    assert_eq!(first, Some(p1));
}

#[test]
fn single_claim_wins_outright() {
    let mut session = Session::new(2);
    let p1 = seed_player(&mut session, "Keen Lynx", true);

    let board = vec![Some(p1.id), None, None, None];
    assert_eq!(resolve(&board, &session.players), Some(p1));
}
