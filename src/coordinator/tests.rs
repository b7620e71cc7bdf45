//! Coordinator Tests
//!
//! Slicing properties, frame codec validation, bus delivery semantics, and
//! complete dispatch/gather/shutdown rounds over the channel fabric with
//! real worker threads.

#[cfg(test)]
mod tests {
    use crate::coordinator::bus::{BusEndpoint, ChannelBus};
    use crate::coordinator::dispatcher::{slice_exams, Dispatcher};
    use crate::coordinator::error::{BusError, CoordinatorError, ProtocolError};
    use crate::coordinator::protocol;
    use crate::coordinator::types::{Answer, Command, Exam, ExamScore, Tag};
    use crate::coordinator::worker::ScoringWorker;
    use crate::grading::answers::AnswerKeyStore;
    use std::thread::JoinHandle;

    fn exam(stage: i32, id_exam: i32, answers: &[(i32, i32)]) -> Exam {
        Exam {
            stage,
            id_exam,
            answers: answers
                .iter()
                .map(|&(qst_idx, ans_idx)| Answer { qst_idx, ans_idx })
                .collect(),
        }
    }

    fn numbered_exams(count: i32) -> Vec<Exam> {
        (0..count).map(|id| exam(1, id, &[(0, 1)])).collect()
    }

    /// Splits a fabric into the master endpoint and one running worker
    /// thread per remaining rank.
    fn master_and_workers(
        size: usize,
    ) -> (BusEndpoint, Vec<JoinHandle<Result<(), CoordinatorError>>>) {
        let mut endpoints = ChannelBus::new(size).into_iter();
        let master = endpoints.next().expect("fabric is never empty");
        let workers = endpoints
            .map(|endpoint| {
                std::thread::spawn(move || ScoringWorker::new(endpoint).unwrap().run())
            })
            .collect();
        (master, workers)
    }

    // ============================================================
    // PARTITIONING
    // ============================================================

    #[test]
    fn surplus_workers_get_one_exam_each() {
        let slices = slice_exams(numbered_exams(3), 5);

        assert_eq!(slices.len(), 3);
        assert!(slices.iter().all(|slice| slice.len() == 1));
    }

    #[test]
    fn deficit_workers_get_ceiling_quotas() {
        // E=7, W=3 -> q=3: slices of 3, 3, 1.
        let slices = slice_exams(numbered_exams(7), 3);

        let sizes: Vec<usize> = slices.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn slices_partition_the_input_in_order() {
        let exams = numbered_exams(11);
        let slices = slice_exams(exams.clone(), 4);

        let reassembled: Vec<Exam> = slices.into_iter().flatten().collect();
        assert_eq!(reassembled, exams);
    }

    #[test]
    fn no_slice_exceeds_the_quota_and_none_is_empty() {
        for total in 1..=20 {
            for workers in 1..=6 {
                let slices = slice_exams(numbered_exams(total), workers);
                let active = (workers).min(total as usize);
                let quota = (total as usize).div_ceil(active);

                assert_eq!(slices.len(), active);
                assert!(slices.iter().all(|slice| !slice.is_empty()));
                assert!(slices.iter().all(|slice| slice.len() <= quota));
            }
        }
    }

    #[test]
    fn empty_input_and_zero_workers_yield_no_slices() {
        assert!(slice_exams(Vec::new(), 4).is_empty());
        assert!(slice_exams(numbered_exams(3), 0).is_empty());
    }

    // ============================================================
    // FRAME CODEC
    // ============================================================

    #[test]
    fn command_bytes_round_trip() {
        let review = protocol::encode_command(Command::Review);
        let shutdown = protocol::encode_command(Command::Shutdown);

        assert_eq!(review, vec![1]);
        assert_eq!(shutdown, vec![2]);
        assert_eq!(protocol::decode_command(&review).unwrap(), Command::Review);
        assert_eq!(
            protocol::decode_command(&shutdown).unwrap(),
            Command::Shutdown
        );
    }

    #[test]
    fn unknown_command_byte_is_fatal() {
        let error = protocol::decode_command(&[3]).unwrap_err();
        assert_eq!(error, ProtocolError::UnknownCommand(3));
    }

    #[test]
    fn non_positive_outer_sizes_are_rejected() {
        let zero = protocol::encode_i32(0);
        let negative = protocol::encode_i32(-4);

        assert!(matches!(
            protocol::decode_positive_i32("exam batch size", &zero),
            Err(ProtocolError::NonPositiveSize { value: 0, .. })
        ));
        assert!(matches!(
            protocol::decode_positive_i32("result count", &negative),
            Err(ProtocolError::NonPositiveSize { value: -4, .. })
        ));
    }

    #[test]
    fn truncated_size_frame_is_rejected() {
        let error = protocol::decode_positive_i32("exam batch size", &[1, 2]).unwrap_err();
        assert!(matches!(error, ProtocolError::FrameLength { actual: 2, .. }));
    }

    #[test]
    fn exam_header_round_trips_and_rejects_negative_counts() {
        let header = protocol::encode_exam_header(&exam(3, 17, &[(0, 0), (1, 1)])).unwrap();
        assert_eq!(protocol::decode_exam_header(&header).unwrap(), (3, 17, 2));

        let mut negative = protocol::encode_exam_header(&exam(3, 17, &[])).unwrap();
        negative[8..12].copy_from_slice(&(-1i32).to_ne_bytes());
        assert!(matches!(
            protocol::decode_exam_header(&negative),
            Err(ProtocolError::NegativeSize { value: -1, .. })
        ));
    }

    #[test]
    fn packed_answers_round_trip() {
        let answers = vec![
            Answer {
                qst_idx: 0,
                ans_idx: 3,
            },
            Answer {
                qst_idx: 7,
                ans_idx: -1,
            },
        ];

        let frame = protocol::encode_answers(&answers);
        assert_eq!(frame.len(), 16);
        assert_eq!(protocol::decode_answers(&frame, 2).unwrap(), answers);
    }

    #[test]
    fn result_record_round_trips() {
        let result = ExamScore {
            stage: 2,
            id_exam: 99,
            correct: 5,
            wrong: 2,
            unscored: 1,
            score: 0.625,
        };

        let frame = protocol::encode_result(&result);
        assert_eq!(frame.len(), 28);
        assert_eq!(protocol::decode_result(&frame).unwrap(), result);
    }

    // ============================================================
    // BUS DELIVERY
    // ============================================================

    #[test]
    fn tags_are_independent_streams() {
        let mut endpoints = ChannelBus::new(2).into_iter();
        let master = endpoints.next().unwrap();
        let worker = endpoints.next().unwrap();

        master.send(1, Tag::Exams, vec![10]).unwrap();
        master.send(1, Tag::Command, vec![20]).unwrap();

        // The command is readable before the earlier exam frame.
        assert_eq!(worker.recv(0, Tag::Command).unwrap(), vec![20]);
        assert_eq!(worker.recv(0, Tag::Exams).unwrap(), vec![10]);
    }

    #[test]
    fn out_of_cohort_ranks_are_rejected() {
        let mut endpoints = ChannelBus::new(2).into_iter();
        let master = endpoints.next().unwrap();

        assert_eq!(
            master.send(5, Tag::Command, vec![1]).unwrap_err(),
            BusError::UnknownRank(5)
        );
        assert_eq!(
            master.recv(0, Tag::Command).unwrap_err(),
            BusError::UnknownRank(0)
        );
    }

    #[test]
    fn dropped_peer_surfaces_as_disconnected() {
        let mut endpoints = ChannelBus::new(2).into_iter();
        let master = endpoints.next().unwrap();
        drop(endpoints.next().unwrap());

        assert!(matches!(
            master.send(1, Tag::Command, vec![1]),
            Err(BusError::Disconnected { rank: 1, .. })
        ));
        assert!(matches!(
            master.recv(1, Tag::Results),
            Err(BusError::Disconnected { rank: 1, .. })
        ));
    }

    // ============================================================
    // ENDPOINT ROLES
    // ============================================================

    #[test]
    fn roles_are_bound_to_their_ranks() {
        let mut endpoints = ChannelBus::new(2).into_iter();
        let master = endpoints.next().unwrap();
        let worker = endpoints.next().unwrap();

        assert!(matches!(
            ScoringWorker::new(master),
            Err(CoordinatorError::NotWorker)
        ));
        assert!(matches!(
            Dispatcher::new(worker),
            Err(CoordinatorError::NotMaster(1))
        ));
    }

    // ============================================================
    // FULL ROUNDS
    // ============================================================

    #[test]
    fn surplus_round_uses_only_the_needed_workers() {
        // E=3, W=5: exactly workers 1..=3 are active; 4 and 5 idle until
        // the shutdown fan-out.
        let (master, workers) = master_and_workers(6);
        let mut dispatcher = Dispatcher::new(master).unwrap();

        let keys = AnswerKeyStore::new();
        keys.set_stage(1, &[Answer { qst_idx: 0, ans_idx: 1 }]);

        dispatcher.dispatch(numbered_exams(3), &keys).unwrap();
        assert_eq!(dispatcher.active_workers(), &[1, 2, 3]);

        let results = dispatcher.gather().unwrap();
        assert_eq!(results.len(), 3);
        let ids: Vec<i32> = results.iter().map(|result| result.id_exam).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(results.iter().all(|result| result.correct == 1));

        dispatcher.shutdown_all().unwrap();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
    }

    #[test]
    fn deficit_round_returns_every_result_in_dispatch_order() {
        // E=7, W=3: quotas 3/3/1, seven results total, input order kept.
        let (master, workers) = master_and_workers(4);
        let mut dispatcher = Dispatcher::new(master).unwrap();

        let keys = AnswerKeyStore::new();
        keys.set_stage(1, &[Answer { qst_idx: 0, ans_idx: 1 }]);

        dispatcher.dispatch(numbered_exams(7), &keys).unwrap();
        assert_eq!(dispatcher.active_workers(), &[1, 2, 3]);

        let results = dispatcher.gather().unwrap();
        let ids: Vec<i32> = results.iter().map(|result| result.id_exam).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6]);

        dispatcher.shutdown_all().unwrap();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
    }

    #[test]
    fn scoring_uses_the_shipped_key_and_keeps_the_arithmetic_invariant() {
        let (master, workers) = master_and_workers(2);
        let mut dispatcher = Dispatcher::new(master).unwrap();

        let keys = AnswerKeyStore::new();
        keys.set_stage(
            1,
            &[
                Answer { qst_idx: 0, ans_idx: 1 },
                Answer { qst_idx: 1, ans_idx: 2 },
            ],
        );

        let exams = vec![
            exam(1, 100, &[(0, 1), (1, 2)]), // both correct
            exam(1, 101, &[(0, 0), (1, 2)]), // one wrong
            exam(1, 102, &[(8, 0)]),         // unknown question
            exam(2, 103, &[(0, 1)]),         // stage without a key
        ];
        dispatcher.dispatch(exams, &keys).unwrap();

        let results = dispatcher.gather().unwrap();
        assert_eq!(results.len(), 4);

        assert_eq!((results[0].correct, results[0].wrong, results[0].unscored), (2, 0, 0));
        assert_eq!(results[0].score, 1.0);
        assert_eq!((results[1].correct, results[1].wrong, results[1].unscored), (1, 1, 0));
        assert_eq!((results[2].correct, results[2].wrong, results[2].unscored), (0, 0, 1));
        assert_eq!((results[3].correct, results[3].wrong, results[3].unscored), (0, 0, 1));

        dispatcher.shutdown_all().unwrap();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
    }

    #[test]
    fn empty_dispatch_clears_the_roster_and_gathers_nothing() {
        let (master, workers) = master_and_workers(3);
        let mut dispatcher = Dispatcher::new(master).unwrap();
        let keys = AnswerKeyStore::new();

        dispatcher.dispatch(Vec::new(), &keys).unwrap();

        assert!(dispatcher.active_workers().is_empty());
        assert!(dispatcher.gather().unwrap().is_empty());

        dispatcher.shutdown_all().unwrap();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
    }

    #[test]
    fn consecutive_rounds_reuse_the_same_workers() {
        let (master, workers) = master_and_workers(3);
        let mut dispatcher = Dispatcher::new(master).unwrap();

        let keys = AnswerKeyStore::new();
        keys.set_stage(1, &[Answer { qst_idx: 0, ans_idx: 1 }]);

        dispatcher.dispatch(numbered_exams(4), &keys).unwrap();
        assert_eq!(dispatcher.gather().unwrap().len(), 4);

        // Second round with an updated key for the same stage.
        keys.set_stage(1, &[Answer { qst_idx: 0, ans_idx: 9 }]);
        dispatcher.dispatch(numbered_exams(2), &keys).unwrap();
        let results = dispatcher.gather().unwrap();

        assert_eq!(results.len(), 2);
        // The replacement key no longer matches the exams' answers.
        assert!(results.iter().all(|result| result.wrong == 1));

        dispatcher.shutdown_all().unwrap();
        for worker in workers {
            worker.join().unwrap().unwrap();
        }
    }
}
