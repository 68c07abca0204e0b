//! Unit tests for search module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::{Categories, Club, ClubFinder, MeetingSlot, MeetingTime, NewClub};
    use std::sync::Arc;

    fn club(id: i64, name: &str, summary: &str, categories: &str, slots: &[(&str, &str)]) -> Club {
        Club {
            id,
            name: name.to_string(),
            url: format!("https://clubs.example.edu/{id}"),
            summary: summary.to_string(),
            categories: Categories::parse(categories),
            meeting_times: slots
                .iter()
                .map(|(d, t)| MeetingTime::new(MeetingSlot::new(*d, *t), None))
                .collect(),
            summary_embedding: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn chess_club() -> Club {
        club(1, "Chess Club", "weekly chess matches", "Games", &[("Monday", "Evening")])
    }

    fn sample_clubs() -> Vec<Club> {
        vec![
            chess_club(),
            club(
                2,
                "Jazz Ensemble",
                "Jazz band rehearsals and campus performances",
                "Music",
                &[("Tuesday", "Evening"), ("Thursday", "Evening")],
            ),
            club(
                3,
                "Martial Arts Society",
                "Karate and judo practice for all levels",
                "Martial Arts, Sports",
                &[("Monday", "Evening"), ("Saturday", "Afternoon")],
            ),
            club(
                4,
                "Art Collective",
                "Painting, drawing and open studio nights",
                "Arts",
                &[("Wednesday", "Night")],
            ),
            club(
                5,
                "Board Game Night",
                "Tabletop games including chess variants",
                "Games, Recreation",
                &[("Friday", "Night"), ("Monday", "Evening")],
            ),
        ]
    }

    fn searcher_with(clubs: Vec<Club>, config: SearchConfig) -> Searcher<MemoryStore> {
        Searcher::new(MemoryStore::new(clubs), &config, None)
    }

    fn searcher(clubs: Vec<Club>) -> Searcher<MemoryStore> {
        searcher_with(clubs, SearchConfig::default())
    }

    fn ids(results: &[ScoredClub]) -> Vec<i64> {
        results.iter().map(|r| r.club.id).collect()
    }

    struct FailingProvider;

    impl EmbeddingProvider for FailingProvider {
        fn available(&self) -> bool {
            true
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn encode(&self, _text: &str) -> SearchResult<Vec<f32>> {
            Err(SearchError::Embedding("model crashed".into()))
        }
    }

    mod scoring_tests {
        use super::*;

        #[test]
        fn test_chess_example_name_and_availability() {
            let s = searcher(vec![chess_club()]);
            let query = SearchQuery::new("chess").with_availability(["Monday-Evening"]);

            let results = s.search(&query).unwrap();
            assert_eq!(ids(&results), vec![1]);

            let breakdown = s.explain(&query, &chess_club());
            assert_eq!(breakdown.name, NAME_POINTS);
            assert_eq!(breakdown.availability, AVAILABILITY_POINTS);
            assert_eq!(breakdown.category, 0);
            assert!(results[0].match_score >= 45);
            assert_eq!(results[0].match_score, breakdown.total());
        }

        #[test]
        fn test_semantic_term_is_scaled_and_floored() {
            let s = searcher(vec![chess_club()]);
            // Term-frequency similarity is 45; floor(45 * 15 / 100) = 6.
            let breakdown = s.explain(&SearchQuery::new("chess"), &chess_club());
            assert_eq!(breakdown.semantic, 6);
            assert_eq!(breakdown.total(), 31);
        }

        #[test]
        fn test_empty_keywords_contribute_nothing() {
            let s = searcher(vec![chess_club()]);
            let breakdown = s.explain(&SearchQuery::new("   "), &chess_club());
            assert_eq!(breakdown, ScoreBreakdown::default());
        }

        #[test]
        fn test_category_points_count_once() {
            let s = searcher(vec![]);
            let c = club(9, "Mixed", "", "Games, Recreation", &[]);
            let query = SearchQuery::default().with_categories(["Games", "Recreation"]);
            assert_eq!(s.explain(&query, &c).category, CATEGORY_POINTS);
        }

        #[test]
        fn test_partial_availability_is_proportional() {
            let s = searcher(vec![]);
            let query = SearchQuery::default()
                .with_availability(["Monday-Evening", "Tuesday-Morning", "Friday-Night"]);
            // 1 of 3 -> floor(20 / 3) = 6
            assert_eq!(s.explain(&query, &chess_club()).availability, 6);

            let query = SearchQuery::default().with_availability(["Monday-Evening", "bogus"]);
            assert_eq!(s.explain(&query, &chess_club()).availability, 10);
        }

        #[test]
        fn test_duplicate_slots_count_once() {
            let s = searcher(vec![]);
            let query = SearchQuery::default()
                .with_availability(["Monday-Evening", "Monday-Evening", "Friday-Night"]);
            assert_eq!(s.explain(&query, &chess_club()).availability, 10);
        }

        #[test]
        fn test_total_is_clamped() {
            let breakdown = ScoreBreakdown {
                name: 100,
                semantic: 100,
                category: 100,
                availability: 100,
            };
            assert_eq!(breakdown.total(), 100);
        }

        #[test]
        fn test_full_match_scores_at_most_100() {
            let s = searcher(vec![]);
            let c = club(7, "Chess", "chess", "Games", &[("Monday", "Evening")]);
            let query = SearchQuery::new("chess")
                .with_categories(["Games"])
                .with_availability(["Monday-Evening"]);
            let breakdown = s.explain(&query, &c);
            assert_eq!(breakdown.semantic, SEMANTIC_POINTS);
            assert_eq!(breakdown.total(), 100);
        }
    }

    mod search_tests {
        use super::*;

        #[test]
        fn test_no_filters_returns_everything_with_zero_score() {
            let results = searcher(sample_clubs()).search(&SearchQuery::default()).unwrap();
            assert_eq!(ids(&results), vec![1, 2, 3, 4, 5]);
            assert!(results.iter().all(|r| r.match_score == 0));
        }

        #[test]
        fn test_unmatched_category_is_not_retrieved() {
            let s = searcher(vec![chess_club()]);
            let results = s
                .search(&SearchQuery::default().with_categories(["Sports"]))
                .unwrap();
            assert!(results.is_empty());
        }

        #[test]
        fn test_unmatched_category_without_pushdown_scores_zero() {
            let mut config = SearchConfig::default();
            config.search.category_pushdown = false;
            let s = searcher_with(vec![chess_club()], config);

            let results = s
                .search(&SearchQuery::default().with_categories(["Sports"]))
                .unwrap();
            assert_eq!(ids(&results), vec![1]);
            assert_eq!(results[0].match_score, 0);
        }

        #[test]
        fn test_unavailable_slot_excludes_club() {
            let s = searcher(vec![chess_club()]);
            let query = SearchQuery::new("chess")
                .with_categories(["Games"])
                .with_availability(["Tuesday-Morning"]);
            assert!(s.search(&query).unwrap().is_empty());
        }

        #[test]
        fn test_only_malformed_slots_exclude_everything() {
            let s = searcher(sample_clubs());
            let query = SearchQuery::default().with_availability(["Monday", "a-b-c"]);
            assert!(s.search(&query).unwrap().is_empty());
        }

        #[test]
        fn test_padded_slot_is_malformed() {
            let s = searcher(vec![chess_club()]);
            let query = SearchQuery::default().with_availability(["Monday - Evening"]);
            assert!(s.search(&query).unwrap().is_empty());

            // Whitespace around the whole string is not part of the slot.
            let query = SearchQuery::default().with_availability([" Monday-Evening "]);
            assert_eq!(ids(&s.search(&query).unwrap()), vec![1]);
        }

        #[test]
        fn test_concurrent_searches_share_one_searcher() {
            let s = Arc::new(Searcher::new(
                MemoryStore::new(sample_clubs()),
                &SearchConfig::default(),
                Some(Arc::new(HashEmbedder::default())),
            ));
            let query = SearchQuery::new("chess games")
                .with_categories(["Games", "Arts"])
                .with_availability(["Monday-Evening", "Wednesday-Night"]);
            let expected = s.search(&query).unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let s = Arc::clone(&s);
                    let query = query.clone();
                    std::thread::spawn(move || s.search(&query).unwrap())
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        }

        #[test]
        fn test_returned_clubs_meet_in_a_requested_slot() {
            let s = searcher(sample_clubs());
            let requested = ["Monday-Evening", "Wednesday-Night"];
            let results = s
                .search(&SearchQuery::default().with_availability(requested))
                .unwrap();
            assert_eq!(ids(&results), vec![1, 3, 4, 5]);
            for result in &results {
                assert!(requested
                    .iter()
                    .filter_map(|r| MeetingSlot::parse(r))
                    .any(|slot| result.club.has_slot(&slot)));
            }
        }

        #[test]
        fn test_results_sorted_by_score_then_retrieval_order() {
            let s = searcher(sample_clubs());
            let results = s.search(&SearchQuery::new("chess")).unwrap();
            let scores: Vec<u8> = results.iter().map(|r| r.match_score).collect();
            assert!(scores.windows(2).all(|w| w[0] >= w[1]));
            // Chess Club has the name match and ranks first.
            assert_eq!(results[0].club.id, 1);
            let zero_ids: Vec<i64> = results
                .iter()
                .filter(|r| r.match_score == 0)
                .map(|r| r.club.id)
                .collect();
            assert_eq!(zero_ids, vec![2, 3, 4]);
        }

        #[test]
        fn test_truncates_to_thirty_in_retrieval_order() {
            let clubs: Vec<Club> = (1..=50)
                .map(|i| club(i, &format!("Club {i}"), "", "Games", &[]))
                .collect();
            let results = searcher(clubs)
                .search(&SearchQuery::default().with_categories(["Games"]))
                .unwrap();
            assert_eq!(results.len(), 30);
            assert_eq!(ids(&results), (1..=30).collect::<Vec<i64>>());
            assert!(results.iter().all(|r| r.match_score == CATEGORY_POINTS));
        }

        #[test]
        fn test_max_results_is_configurable() {
            let mut config = SearchConfig::default();
            config.search.max_results = 2;
            let results = searcher_with(sample_clubs(), config)
                .search(&SearchQuery::default())
                .unwrap();
            assert_eq!(ids(&results), vec![1, 2]);
        }

        #[test]
        fn test_search_is_idempotent() {
            let s = searcher(sample_clubs());
            let query = SearchQuery::new("games night")
                .with_categories(["Games", "Arts"])
                .with_availability(["Monday-Evening", "Wednesday-Night"]);
            assert_eq!(s.search(&query).unwrap(), s.search(&query).unwrap());
        }

        #[test]
        fn test_adding_matching_category_never_lowers_score() {
            let s = searcher(sample_clubs());
            let base = SearchQuery::new("chess").with_categories(["Music"]);
            let more = SearchQuery::new("chess").with_categories(["Music", "Games"]);
            for c in sample_clubs() {
                assert!(s.explain(&more, &c).total() >= s.explain(&base, &c).total());
            }

            let before = s.search(&base).unwrap();
            let after = s.search(&more).unwrap();
            for r in &before {
                let same = after.iter().find(|a| a.club.id == r.club.id).unwrap();
                assert!(same.match_score >= r.match_score);
            }
        }

        #[test]
        fn test_scores_always_within_bounds() {
            let s = searcher(sample_clubs());
            let queries = [
                SearchQuery::new("chess").with_categories(["Games", "Music", "Arts"]),
                SearchQuery::new("jazz band").with_availability(["Tuesday-Evening", "Thursday-Evening"]),
                SearchQuery::new("a").with_categories(["a"]).with_availability(["Monday-Evening"]),
                SearchQuery::new("Martial Arts Society Karate"),
            ];
            for query in &queries {
                for r in s.search(query).unwrap() {
                    assert!(r.match_score <= 100);
                }
            }
        }

        #[test]
        fn test_substring_category_mode_matches_inside_labels() {
            let s = searcher(sample_clubs());
            let results = s.search(&SearchQuery::default().with_categories(["Art"])).unwrap();
            assert_eq!(ids(&results), vec![3, 4]);
            assert!(results.iter().all(|r| r.match_score == CATEGORY_POINTS));
        }

        #[test]
        fn test_label_category_mode_drops_partial_matches() {
            let mut config = SearchConfig::default();
            config.search.category_match = CategoryMatchMode::Label;
            let s = searcher_with(sample_clubs(), config);

            let results = s.search(&SearchQuery::default().with_categories(["Art"])).unwrap();
            assert!(results.is_empty());

            let results = s.search(&SearchQuery::default().with_categories(["arts"])).unwrap();
            assert_eq!(ids(&results), vec![4]);
        }

        #[test]
        fn test_failing_provider_degrades_instead_of_failing() {
            let s = Searcher::new(
                MemoryStore::new(vec![chess_club()]),
                &SearchConfig::default(),
                Some(Arc::new(FailingProvider)),
            );
            let results = s.search(&SearchQuery::new("chess")).unwrap();
            assert_eq!(results.len(), 1);
            // name 25 + floor(50 * 15 / 100) from the substring fallback
            assert_eq!(results[0].match_score, 25 + 7);
        }

        #[test]
        fn test_hash_provider_ranks_related_summary_higher() {
            let s = Searcher::new(
                MemoryStore::new(sample_clubs()),
                &SearchConfig::default(),
                Some(Arc::new(HashEmbedder::default())),
            );
            let results = s.search(&SearchQuery::new("jazz")).unwrap();
            assert_eq!(results[0].club.id, 2);
        }
    }

    mod request_tests {
        use super::*;

        #[test]
        fn test_missing_body_is_rejected() {
            let s = searcher(sample_clubs());
            for body in ["", "   ", "null"] {
                let err = s.search_request(body).unwrap_err();
                assert!(matches!(err, SearchError::InvalidRequest(_)), "body {body:?}");
            }
        }

        #[test]
        fn test_malformed_body_is_rejected() {
            let s = searcher(sample_clubs());
            assert!(matches!(
                s.search_request("{\"keywords\": ").unwrap_err(),
                SearchError::InvalidRequest(_)
            ));
        }

        #[test]
        fn test_empty_object_is_unfiltered_search() {
            let results = searcher(sample_clubs()).search_request("{}").unwrap();
            assert_eq!(results.len(), 5);
        }

        #[test]
        fn test_request_fields() {
            let body = r#"{"keywords":"chess","categories":[],"availability":["Monday-Evening"]}"#;
            let results = searcher(sample_clubs()).search_request(body).unwrap();
            assert_eq!(ids(&results)[0], 1);
            assert!(results.iter().all(|r| r.club.has_slot(&MeetingSlot::new("Monday", "Evening"))));
        }

        #[test]
        fn test_scored_club_serializes_match_score() {
            let results = searcher(vec![chess_club()])
                .search(&SearchQuery::new("chess"))
                .unwrap();
            let json = serde_json::to_value(&results[0]).unwrap();
            assert_eq!(json["matchScore"], 31);
            assert_eq!(json["name"], "Chess Club");
            assert_eq!(json["categories"], "Games");
            assert_eq!(json["meeting_times"][0]["day"], "Monday");
        }
    }

    mod store_tests {
        use super::*;

        fn finder_with(n: usize) -> ClubFinder {
            let finder = ClubFinder::open_in_memory().unwrap();
            let clubs: Vec<NewClub> = (1..=n)
                .map(|i| NewClub {
                    name: format!("Club {i:02}"),
                    summary: format!("summary number {i}"),
                    categories: Categories::parse(if i % 2 == 0 { "Games" } else { "Music" }),
                    meeting_times: vec![MeetingTime::new(MeetingSlot::new("Monday", "Evening"), None)],
                    ..Default::default()
                })
                .collect();
            finder.add_clubs(&clubs).unwrap();
            finder
        }

        #[test]
        fn test_get_all_paged() {
            let s = Searcher::new(finder_with(45), &SearchConfig::default(), None);

            let first = s.get_all_paged(1, None).unwrap();
            assert_eq!(first.total, 45);
            assert_eq!(first.page_size, 20);
            assert_eq!(first.page_count, 3);
            assert_eq!(first.clubs.len(), 20);
            assert_eq!(first.clubs[0].name, "Club 01");

            let last = s.get_all_paged(3, None).unwrap();
            assert_eq!(last.clubs.len(), 5);
            assert_eq!(last.clubs[0].name, "Club 41");

            assert!(s.get_all_paged(4, None).unwrap().clubs.is_empty());
        }

        #[test]
        fn test_get_all_paged_rejects_zero() {
            let s = Searcher::new(finder_with(3), &SearchConfig::default(), None);
            assert!(matches!(s.get_all_paged(0, None), Err(SearchError::InvalidRequest(_))));
            assert!(matches!(s.get_all_paged(1, Some(0)), Err(SearchError::InvalidRequest(_))));
        }

        #[test]
        fn test_get_all_paged_caps_page_size() {
            let s = Searcher::new(finder_with(3), &SearchConfig::default(), None);
            let page = s.get_all_paged(1, Some(10_000)).unwrap();
            assert_eq!(page.page_size, 100);
            assert_eq!(page.page_count, 1);
            assert_eq!(page.clubs.len(), 3);
        }

        #[test]
        fn test_get_all_paged_empty_store() {
            let s = searcher(vec![]);
            let page = s.get_all_paged(1, Some(10)).unwrap();
            assert_eq!(page.total, 0);
            assert_eq!(page.page_count, 0);
            assert!(page.clubs.is_empty());
        }

        #[test]
        fn test_get_by_id() {
            let s = searcher(sample_clubs());
            assert_eq!(s.get_by_id(4).unwrap().unwrap().name, "Art Collective");
            assert!(s.get_by_id(404).unwrap().is_none());
        }

        #[test]
        fn test_search_over_sqlite_store_pushes_down_categories() {
            let s = Searcher::new(finder_with(10), &SearchConfig::default(), None);
            let results = s
                .search(&SearchQuery::default().with_categories(["games"]))
                .unwrap();
            assert_eq!(results.len(), 5);
            assert!(results.iter().all(|r| r.club.categories.contains_label("Games")));
            assert!(results.windows(2).all(|w| w[0].club.id < w[1].club.id));
        }

        #[test]
        fn test_category_pushdown_folds_non_ascii_case() {
            let finder = ClubFinder::open_in_memory().unwrap();
            finder
                .add_club(&NewClub {
                    name: "Cercle Pédagogique".into(),
                    categories: Categories::parse("Éducation"),
                    ..Default::default()
                })
                .unwrap();
            let memory = MemoryStore::new(finder.list_clubs().unwrap());
            let query = SearchQuery::default().with_categories(["éducation"]);

            let sql = Searcher::new(finder, &SearchConfig::default(), None)
                .search(&query)
                .unwrap();
            let mem = Searcher::new(memory, &SearchConfig::default(), None)
                .search(&query)
                .unwrap();
            assert_eq!(sql.len(), 1);
            assert_eq!(sql, mem);
            assert_eq!(sql[0].match_score, CATEGORY_POINTS);
        }

        #[test]
        fn test_vectorizer_caches_embeddings_used_by_search() {
            let finder = finder_with(4);
            let embedder = HashEmbedder::new(32);
            let mut seen = Vec::new();
            let stats = Vectorizer::new(&finder, &embedder)
                .run_with_progress(|p| seen.push(p.percent))
                .unwrap();
            assert_eq!(stats.total_clubs, 4);
            assert_eq!(stats.vectorized, 4);
            assert_eq!(stats.errors, 0);
            assert_eq!(seen, vec![25, 50, 75, 100]);

            let club = finder.get_club(1).unwrap().unwrap();
            let bytes = club.summary_embedding.clone().unwrap();
            assert_eq!(decode_embedding(&bytes).unwrap().len(), 32);

            let s = Searcher::new(finder.clone(), &SearchConfig::default(), Some(Arc::new(embedder)));
            let results = s.search(&SearchQuery::new("summary number")).unwrap();
            assert_eq!(results.len(), 4);
        }

        #[test]
        fn test_vectorizer_counts_encode_failures() {
            let finder = finder_with(2);
            let stats = Vectorizer::new(&finder, &FailingProvider).run().unwrap();
            assert_eq!(stats.vectorized, 0);
            assert_eq!(stats.errors, 2);
            assert!(finder.get_club(1).unwrap().unwrap().summary_embedding.is_none());
        }

        #[test]
        fn test_vectorizer_requires_available_provider() {
            struct Offline;
            impl EmbeddingProvider for Offline {
                fn available(&self) -> bool {
                    false
                }
                fn dimensions(&self) -> usize {
                    0
                }
                fn encode(&self, _text: &str) -> SearchResult<Vec<f32>> {
                    Err(SearchError::EmbeddingUnavailable)
                }
            }

            let finder = finder_with(1);
            let err = Vectorizer::new(&finder, &Offline).run().unwrap_err();
            assert!(matches!(err, SearchError::EmbeddingUnavailable));
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_search_config_default() {
            let config = SearchConfig::default();
            assert_eq!(config.search.max_results, 30);
            assert_eq!(config.search.default_page_size, 20);
            assert_eq!(config.search.category_match, CategoryMatchMode::Substring);
            assert!(config.search.category_pushdown);
            assert_eq!(config.embedding.provider, ProviderKind::Hash);
        }

        #[test]
        fn test_search_config_from_toml() {
            let config = SearchConfig::from_toml(
                r#"
                [embedding]
                provider = "none"

                [search]
                max_results = 10
                category_match = "label"

                [paths]
                db_path = "/tmp/clubs-test.db"
                "#,
            )
            .unwrap();
            assert_eq!(config.embedding.provider, ProviderKind::None);
            assert_eq!(config.embedding.dimensions, 384);
            assert_eq!(config.search.max_results, 10);
            assert_eq!(config.search.default_page_size, 20);
            assert_eq!(config.search.category_match, CategoryMatchMode::Label);
            assert_eq!(
                config.paths.get_db_path(),
                std::path::PathBuf::from("/tmp/clubs-test.db")
            );
        }

        #[test]
        fn test_search_config_rejects_bad_toml() {
            let err = SearchConfig::from_toml("[search]\nmax_results = \"many\"").unwrap_err();
            assert!(matches!(err, SearchError::Config(_)));
        }

        #[test]
        fn test_search_config_rejects_zero_sizes() {
            let err = SearchConfig::from_toml("[search]\nmax_results = 0").unwrap_err();
            assert!(matches!(err, SearchError::Config(_)));
            let err = SearchConfig::from_toml("[search]\ndefault_page_size = 0").unwrap_err();
            assert!(matches!(err, SearchError::Config(_)));
        }

        #[test]
        fn test_open_store_uses_configured_db_path() {
            let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
            let db_path = temp_dir.path().join("nested").join("configured.db");
            let config = SearchConfig::from_toml(&format!(
                "[paths]\ndb_path = '{}'",
                db_path.display()
            ))
            .unwrap();

            let store = config.open_store().unwrap();
            assert_eq!(store.env_info().db_path, db_path);
            assert!(db_path.exists());
            store
                .add_club(&NewClub {
                    name: "Chess Club".into(),
                    ..Default::default()
                })
                .unwrap();

            let reopened = config.open_store().unwrap();
            assert_eq!(reopened.count_clubs().unwrap(), 1);
        }

        #[test]
        fn test_shared_provider_is_built_once() {
            let config = EmbeddingConfig::default();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let config = config.clone();
                    std::thread::spawn(move || shared_provider(&config))
                })
                .collect();
            let providers: Vec<_> = handles
                .into_iter()
                .map(|h| h.join().unwrap().expect("hash provider is configured"))
                .collect();
            for provider in &providers[1..] {
                assert!(Arc::ptr_eq(&providers[0], provider));
            }
            let again = shared_provider(&config).unwrap();
            assert!(Arc::ptr_eq(&providers[0], &again));
        }

        #[test]
        fn test_build_provider_from_config() {
            let config = SearchConfig::default();
            let provider = build_provider(&config.embedding).unwrap().unwrap();
            assert!(provider.available());
            assert_eq!(provider.dimensions(), 384);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_search_error_display() {
            let err = SearchError::InvalidRequest("request body is required".to_string());
            assert!(err.to_string().contains("request body is required"));
        }

        #[test]
        fn test_search_error_from_core() {
            let err = SearchError::from(crate::CoreError::NotFound(7));
            assert!(err.to_string().contains("club 7 not found"));
        }
    }
}
