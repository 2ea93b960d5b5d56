use trainer::collective::LocalGroup;
use trainer::data::equalize;

#[tokio::test]
async fn every_worker_pads_to_the_longest_list() {
    let lists: Vec<Vec<i64>> = vec![vec![1, 2], vec![10, 20, 30, 40, 50], vec![7]];

    let mut tasks = Vec::new();
    for (mut group, nids) in LocalGroup::group(3).into_iter().zip(lists.clone()) {
        tasks.push(tokio::spawn(async move {
            equalize(&mut group, &nids).await.unwrap()
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    for (padded, original) in results.iter().zip(&lists) {
        assert_eq!(padded.len(), 5);
        assert_eq!(&padded[..original.len()], &original[..]);
        for (i, v) in padded.iter().enumerate() {
            assert_eq!(*v, original[i % original.len()]);
        }
    }
}

#[tokio::test]
async fn uniform_lists_come_back_unchanged() {
    let lists: Vec<Vec<i64>> = vec![vec![3, 1, 4], vec![1, 5, 9], vec![2, 6, 5]];

    let mut tasks = Vec::new();
    for (mut group, nids) in LocalGroup::group(3).into_iter().zip(lists.clone()) {
        tasks.push(tokio::spawn(async move {
            equalize(&mut group, &nids).await.unwrap()
        }));
    }

    for (task, original) in tasks.into_iter().zip(lists) {
        assert_eq!(task.await.unwrap(), original);
    }
}

#[tokio::test]
async fn ties_with_the_max_are_no_ops() {
    let lists: Vec<Vec<i64>> = vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8], vec![9]];

    let mut tasks = Vec::new();
    for (mut group, nids) in LocalGroup::group(3).into_iter().zip(lists.clone()) {
        tasks.push(tokio::spawn(async move {
            equalize(&mut group, &nids).await.unwrap()
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }

    // Both maximal workers keep their input, the short one cycles.
    assert_eq!(results[0], lists[0]);
    assert_eq!(results[1], lists[1]);
    assert_eq!(results[2], vec![9, 9, 9, 9]);
}
